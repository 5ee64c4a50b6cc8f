use std::panic::Location;

/// Which end of a block an HTML comment marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Start,
    End,
}

/// Render an HTML comment naming the calling file and line.
///
/// Returns an empty string unless `enabled` (normally
/// `Settings::show_comments`). The first line is the headline; later lines
/// are listed below the location.
#[track_caller]
pub fn html_comment(enabled: bool, lines: &[&str], marker: Option<Marker>) -> String {
    if !enabled {
        return String::new();
    }
    let caller = Location::caller();
    render_comment(caller.file(), caller.line(), lines, marker)
}

fn render_comment(file: &str, line: u32, lines: &[&str], marker: Option<Marker>) -> String {
    let (first, rest) = match lines {
        [] => ("", &[][..]),
        [first, rest @ ..] => (*first, rest),
    };
    let extra: String = rest.iter().map(|l| format!("\n ! {}", l)).collect();

    match marker {
        Some(marker) => {
            let prefix = match marker {
                Marker::Start => "START:",
                Marker::End => " END: ",
            };
            format!(
                "\n\n<!--\n ! {} {}\n ! File: {}\n ! Line: {}{}\n ! -->\n\n",
                prefix, first, file, line, extra
            )
        }
        None => {
            let first = if first.is_empty() {
                String::new()
            } else {
                format!("\n ! {}", first)
            };
            format!(
                "\n\n<!-- (Line: {}; File: {}){}{}\n ! -->\n\n",
                line, file, first, extra
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_is_empty() {
        assert_eq!(html_comment(false, &["hidden"], None), "");
    }

    #[test]
    fn test_caller_location() {
        let out = html_comment(true, &["nav"], Some(Marker::Start));
        assert!(out.contains(" ! START: nav\n"));
        assert!(out.contains(&format!(" ! File: {}\n", file!())));
    }

    #[test]
    fn test_plain_comment() {
        let out = render_comment("page.rs", 12, &["header", "user: 7"], None);
        assert_eq!(out, "\n\n<!-- (Line: 12; File: page.rs)\n ! header\n ! user: 7\n ! -->\n\n");
    }

    #[test]
    fn test_end_marker() {
        let out = render_comment("page.rs", 40, &["footer"], Some(Marker::End));
        assert_eq!(
            out,
            "\n\n<!--\n !  END:  footer\n ! File: page.rs\n ! Line: 40\n ! -->\n\n"
        );
    }
}

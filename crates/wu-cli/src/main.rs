//! `wu`: command line access to the web utility helpers.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use wu_core::config::settings::SETTINGS_PATH;
use wu_core::input::{
    get_valid_from_array, DateRules, Mode, NumericRules, PhoneKind, TextRules, TimeRules,
    YearRules,
};
use wu_core::mail::{Sendmail, SimpleMail};
use wu_core::random::{RandomStr, StrKind};
use wu_core::text::{get_money, get_price_parts, html_comment, Marker};
use wu_core::{Settings, TemplateEngine};
use wu_crypto::{generate_key, Crypto, CryptoNow, Key, NonceTable};
use wu_db::queries::create_nonce_table;
use wu_db::EnhancedDb;
use wu_sftp::{SftpClient, SftpConfig, DEFAULT_DIR_MODE, DEFAULT_FILE_MODE};

#[derive(Parser)]
#[command(name = "wu", version, about = "Web application utility helpers")]
struct Cli {
    /// Settings file. Falls back to defaults plus WU_* variables when the
    /// default file is absent.
    #[arg(short, long, global = true, env = "WU_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a new encryption key (mode 0600)
    Keygen {
        /// Directory for the key; defaults to the configured key file's directory
        #[arg(long)]
        dir: Option<PathBuf>,
        /// File name; defaults to the configured key file's name
        #[arg(long)]
        name: Option<String>,
    },

    /// Create the nonce table if it does not exist
    NonceTable,

    /// Encrypt a message, printing the nonce id and ciphertext as JSON
    Encrypt {
        message: String,
        #[arg(long, default_value = "")]
        auth: String,
        /// Keep the nonce after the first decryption
        #[arg(long)]
        reusable: bool,
    },

    /// Decrypt a message produced by `encrypt`
    Decrypt {
        message: String,
        id: u64,
        #[arg(long, default_value = "")]
        auth: String,
    },

    /// Generate random test data
    Random {
        /// address, email, domain, country, phone, mobile, int-phone,
        /// postcode, title, sentence, or a word list kind (word, name,
        /// street, state, tld, alpha)
        kind: String,
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,
    },

    /// Render a template with JSON data
    Render {
        template: String,
        /// JSON object holding the values
        #[arg(long, default_value = "{}")]
        data: String,
        /// Let camelCase tokens fall back to snake_case keys
        #[arg(long)]
        camel: bool,
    },

    /// Run a value through a form sanitiser or validator
    Check {
        /// email, url, name, title, html, text, mobile, landline, os-phone,
        /// phone, postcode, date, datetime, time, year, int, numeric, ref-id
        mode: String,
        value: String,
    },

    /// Show a price with its GST component
    Price {
        amount: f64,
        /// Split out the GST component
        #[arg(long)]
        gst: bool,
    },

    /// Send an HTML email through sendmail
    Mail {
        #[arg(long)]
        to: String,
        #[arg(long)]
        subject: String,
        /// File holding the HTML body
        #[arg(long)]
        html: PathBuf,
        /// Extra header lines, e.g. "Reply-To: office@uni.edu.au"
        #[arg(long = "header")]
        headers: Vec<String>,
        #[arg(long = "attach")]
        attachments: Vec<PathBuf>,
    },

    /// Transfer files over SFTP
    Sftp {
        #[arg(long)]
        host: String,
        #[arg(long, default_value = "22")]
        port: u16,
        #[arg(long)]
        user: String,
        #[arg(long, env = "WU_SFTP_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        #[arg(long, requires = "private_key")]
        public_key: Option<PathBuf>,
        #[arg(long, requires = "public_key")]
        private_key: Option<PathBuf>,
        #[command(subcommand)]
        action: SftpAction,
    },
}

#[derive(Subcommand)]
enum SftpAction {
    Upload {
        local: PathBuf,
        remote: String,
    },
    Download {
        remote: String,
        local: PathBuf,
    },
    Delete {
        remote: String,
    },
    Mkdir {
        remote: String,
    },
}

#[tokio::main]
async fn main() {
    // RUST_LOG controls log levels, defaulting to info. Logs go to stderr so
    // command output can be piped.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(cli.config.as_deref())?;

    match cli.command {
        Commands::Keygen { dir, name } => cmd_keygen(&settings, dir, name),
        Commands::NonceTable => cmd_nonce_table(&settings).await,
        Commands::Encrypt {
            message,
            auth,
            reusable,
        } => cmd_encrypt(&settings, &message, &auth, !reusable).await,
        Commands::Decrypt { message, id, auth } => {
            cmd_decrypt(&settings, &message, id, &auth).await
        }
        Commands::Random { kind, count } => cmd_random(&settings, &kind, count),
        Commands::Render {
            template,
            data,
            camel,
        } => cmd_render(&settings, &template, &data, camel),
        Commands::Check { mode, value } => cmd_check(&mode, &value),
        Commands::Price { amount, gst } => cmd_price(&settings, amount, gst),
        Commands::Mail {
            to,
            subject,
            html,
            headers,
            attachments,
        } => cmd_mail(&settings, &to, &subject, &html, &headers, &attachments),
        Commands::Sftp {
            host,
            port,
            user,
            password,
            public_key,
            private_key,
            action,
        } => {
            let config = match (public_key, private_key) {
                (Some(public), Some(private)) => {
                    SftpConfig::with_key_pair(&host, &user, public, private, password.as_deref())
                }
                _ => SftpConfig::with_password(&host, &user, password.as_deref().unwrap_or("")),
            };
            cmd_sftp(config.port(port), action)
        }
    }
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    match path {
        Some(path) => Settings::load(path)
            .with_context(|| format!("Failed to load settings from {}", path.display())),
        None if Path::new(SETTINGS_PATH).exists() => {
            Settings::load(Path::new(SETTINGS_PATH)).context("Failed to load default settings")
        }
        None => Settings::from_env().context("Invalid WU_* environment settings"),
    }
}

// ============ CRYPTO ============

fn cmd_keygen(settings: &Settings, dir: Option<PathBuf>, name: Option<String>) -> Result<()> {
    let key_file = &settings.crypto.key_file;
    let dir = dir
        .or_else(|| key_file.parent().map(Path::to_path_buf))
        .context("No key directory given or configured")?;
    let name = name
        .or_else(|| {
            key_file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
        })
        .context("No key file name given or configured")?;

    let path = generate_key(&dir, &name).context("Key generation failed")?;
    println!("{}", path.display());
    Ok(())
}

async fn connect_db(settings: &Settings) -> Result<Arc<EnhancedDb>> {
    let db = &settings.database;
    let db = EnhancedDb::connect(
        &db.dsn,
        db.user.as_deref().unwrap_or(""),
        db.password.as_deref().unwrap_or(""),
    )
    .await
    .context("Database connection failed")?;
    Ok(Arc::new(db))
}

async fn cmd_nonce_table(settings: &Settings) -> Result<()> {
    let db = connect_db(settings).await?;
    create_nonce_table(&db, &settings.crypto.nonce_table)
        .await
        .context("Failed to create nonce table")?;
    info!(table = %settings.crypto.nonce_table, "Nonce table ready");
    Ok(())
}

async fn init_crypto(settings: &Settings) -> Result<()> {
    let key = Key::load(&settings.crypto.key_file).context("Failed to load encryption key")?;
    let db = connect_db(settings).await?;
    let table = NonceTable::new(db, &settings.crypto.nonce_table)?;
    let crypto = Crypto::new(key, table)
        .await
        .context("Nonce table is not usable")?;
    CryptoNow::init(crypto);
    Ok(())
}

async fn cmd_encrypt(settings: &Settings, message: &str, auth: &str, single_use: bool) -> Result<()> {
    init_crypto(settings).await?;
    let sealed = CryptoNow::encrypt(message.as_bytes(), auth.as_bytes(), single_use).await?;
    println!("{}", serde_json::to_string(&sealed)?);
    Ok(())
}

async fn cmd_decrypt(settings: &Settings, message: &str, id: u64, auth: &str) -> Result<()> {
    init_crypto(settings).await?;
    match CryptoNow::decrypt(message, id, auth.as_bytes()).await? {
        Some(plain) => {
            println!("{}", String::from_utf8_lossy(&plain));
            Ok(())
        }
        None => bail!("No nonce with id {}", id),
    }
}

// ============ TEXT ============

fn cmd_random(settings: &Settings, kind: &str, count: usize) -> Result<()> {
    let words_file = settings
        .words_file
        .as_deref()
        .context("words_file is not set in the settings")?;
    let random = RandomStr::load(words_file)?;

    for _ in 0..count {
        let value = match kind {
            "address" => random.get_address(),
            "email" => random.get_email(),
            "domain" => random.get_domain(0),
            "country" => random.get_country(0),
            "phone" => random.get_phone(false),
            "mobile" => random.get_phone(true),
            "int-phone" => random.get_int_phone(12, 8),
            "postcode" => random.get_post_code(),
            "title" => random.get_title(true).to_string(),
            "sentence" => random.get_words(12, Some(4)),
            other => random.get_str(other.parse::<StrKind>()?).to_string(),
        };
        println!("{}", value);
    }
    Ok(())
}

fn cmd_render(settings: &Settings, template: &str, data: &str, camel: bool) -> Result<()> {
    let engine = TemplateEngine::from_settings(&settings.template)?;
    let values: serde_json::Value = serde_json::from_str(data).context("--data must be JSON")?;
    let output = engine.render(template, &values, camel)?;

    let show = settings.show_comments;
    print!("{}", html_comment(show, &[template], Some(Marker::Start)));
    print!("{}", output);
    print!("{}", html_comment(show, &[template], Some(Marker::End)));
    Ok(())
}

fn cmd_check(mode: &str, value: &str) -> Result<()> {
    let date_rules = DateRules::new();
    let time_rules = TimeRules::new();
    let year_rules = YearRules::new();
    let text_rules = TextRules::new();

    let mode = match mode {
        "email" => Mode::Email,
        "url" => Mode::Url,
        "name" => Mode::Name(None),
        "title" => Mode::Title(None),
        "html" => Mode::Html,
        "text" => Mode::Text(&text_rules),
        "mobile" => Mode::Mobile,
        "landline" => Mode::FixedPhone,
        "os-phone" => Mode::OsPhone,
        "phone" => Mode::AnyPhone(&PhoneKind::ALL),
        "postcode" => Mode::AuPostcode { no_po_box: false },
        "date" => Mode::Date(&date_rules),
        "datetime" => Mode::DateTime(&date_rules),
        "time" => Mode::Time(&time_rules),
        "year" => Mode::Year(&year_rules),
        "int" => Mode::Int(NumericRules::new()),
        "numeric" => Mode::Numeric(NumericRules::new()),
        "ref-id" => Mode::RefId,
        other => bail!("Unknown check mode {:?}", other),
    };

    let form = HashMap::from([("value".to_string(), value.to_string())]);
    let checked = get_valid_from_array("value", &form, mode)?;
    if !checked.is_valid() {
        bail!("{:?} is not valid", value);
    }
    println!("{}", checked);
    Ok(())
}

fn cmd_price(settings: &Settings, amount: f64, gst: bool) -> Result<()> {
    let parts = get_price_parts(amount, gst, settings.gst_percent);
    if gst {
        println!(
            "{} (GST {}, ex GST {})",
            get_money(parts.amount, true),
            get_money(parts.gst, true),
            get_money(parts.base, true)
        );
    } else {
        println!("{}", get_money(parts.amount, true));
    }
    Ok(())
}

// ============ TRANSPORT ============

fn cmd_mail(
    settings: &Settings,
    to: &str,
    subject: &str,
    html: &Path,
    headers: &[String],
    attachments: &[PathBuf],
) -> Result<()> {
    let body = std::fs::read_to_string(html)
        .with_context(|| format!("Failed to read {}", html.display()))?;
    let mut mail = SimpleMail::new(to, subject, &body, &headers.join("\n"))?;
    for path in attachments {
        mail.attach_file(path, None)?;
    }

    mail.send(&Sendmail::from_settings(&settings.mail))
        .context("Failed to send mail")?;
    info!(to = %to, "Mail sent");
    Ok(())
}

fn cmd_sftp(config: SftpConfig, action: SftpAction) -> Result<()> {
    let mut client = SftpClient::connect(config).context("SFTP connection failed")?;

    match action {
        SftpAction::Upload { local, remote } => {
            let bytes = client.upload(&local, &remote, DEFAULT_FILE_MODE)?;
            info!(bytes, remote = %remote, "Uploaded");
        }
        SftpAction::Download { remote, local } => {
            let path = client.download(&remote, &local)?;
            println!("{}", path.display());
        }
        SftpAction::Delete { remote } => client.delete(&remote)?,
        SftpAction::Mkdir { remote } => client.mkdir(&remote, DEFAULT_DIR_MODE)?,
    }

    client.disconnect()?;
    Ok(())
}

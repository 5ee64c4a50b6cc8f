//! Fixed lists `RandomStr` draws from alongside the word list.

/// Country returned by `get_country` when the skew favours home.
pub const HOME: &str = "Australia";

pub const TITLES: &[&str] = &[
    "n/a", "Mr", "Ms", "Mx", "Dr", "Hon", "Jr", "Most Rev", "Miss", "Mrs", "Prof", "Assoc Prof",
    "Em Prof", "Sir", "Sr", "Sr Dr", "Sr Prof", "Rev", "Rev Dr", "Rev Prof", "Rt Hon", "Very Rev",
];

/// The first `COMMON_TITLES` entries of `TITLES` are the everyday ones.
pub const COMMON_TITLES: usize = 5;

pub const STREETS: &[&str] = &[
    "Ally", "Arc", "Ave", "Cct", "Cl", "Crn", "Ct", "Cres", "Cds", "Dr", "Esp", "Grn", "Gr", "Hwy",
    "Jnc", "Lane", "Link", "Mews", "Pde", "Pl", "Rdge", "Rd", "Sq", "St", "Tce",
];

pub const STATES: &[&str] = &["ACT", "NSW", "NT", "Qld", "SA", "Tas", "Vic", "WA"];

pub const TLDS: &[&str] = &["com", "co", "net", "org", "edu", "gov"];

pub const ALPHA: &[&str] = &[
    "a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l", "m", "n", "o", "p", "q", "r", "s",
    "t", "u", "v", "w", "x", "y", "z",
];

pub const COUNTRIES: &[&str] = &[
    "Afghanistan", "Albania", "Algeria", "Andorra", "Angola", "Antigua and Barbuda", "Argentina",
    "Armenia", "Artsakh", "Australia", "Austria", "Azerbaijan", "Bahamas, The", "Bahrain",
    "Bangladesh", "Barbados", "Belarus", "Belgium", "Belize", "Benin", "Bhutan", "Bolivia",
    "Bosnia and Herzegovina", "Botswana", "Brazil", "Brunei", "Bulgaria", "Burkina Faso", "Burma",
    "Burundi", "Cambodia", "Cameroon", "Canada", "Cape Verde", "Central African Republic", "Chad",
    "Chile", "China", "Colombia", "Comoros", "Congo, Democratic Republic of the",
    "Congo, Republic of the", "Cook Islands", "Costa Rica", "Cote d'Ivoire", "Croatia", "Cuba",
    "Cyprus", "Czech Republic", "Democratic People's Republic of Korea",
    "Democratic Republic of the Congo", "Denmark", "Djibouti", "Dominica", "Dominican Republic",
    "East Timor", "Ecuador", "Egypt", "El Salvador", "Equatorial Guinea", "Eritrea", "Estonia",
    "Eswatini", "Ethiopia", "Fiji", "Finland", "France", "Gabon", "Gambia, The", "Georgia",
    "Germany", "Ghana", "Greece", "Grenada", "Guatemala", "Guinea", "Guinea-Bissau", "Guyana",
    "Haiti", "Holy See", "Honduras", "Hungary", "Iceland", "India", "Indonesia", "Iran", "Iraq",
    "Ireland", "Israel", "Italy", "Ivory Coast", "Jamaica", "Japan", "Jordan", "Kazakhstan",
    "Kenya", "Kiribati", "Korea, North", "Korea, South", "Kosovo", "Kuwait", "Kyrgyzstan", "Laos",
    "Latvia", "Lebanon", "Lesotho", "Liberia", "Libya", "Liechtenstein", "Lithuania", "Luxembourg",
    "Macedonia", "Madagascar", "Malawi", "Malaysia", "Maldives", "Mali", "Malta",
    "Marshall Islands", "Mauritania", "Mauritius", "Mexico", "Micronesia", "Moldova", "Monaco",
    "Mongolia", "Montenegro", "Morocco", "Mozambique", "Myanmar", "Nagorno-Karabakh", "Namibia",
    "Nauru", "Nepal", "Netherlands", "New Zealand", "Nicaragua", "Niger", "Nigeria", "Niue",
    "North Korea", "North Macedonia", "Northern Cyprus", "Norway", "Oman", "Pakistan", "Palau",
    "Palestine", "Panama", "Papua New Guinea", "Paraguay", "Peru", "Philippines", "Poland",
    "Portugal", "Pridnestrovie", "Qatar", "Republic of Korea", "Republic of the Congo", "Romania",
    "Russia", "Rwanda", "Sahrawi Arab Democratic Republic", "Saint Kitts and Nevis", "Saint Lucia",
    "Saint Vincent and the Grenadines", "Samoa", "San Marino", "Sao Tome and Principe",
    "Saudi Arabia", "Senegal", "Serbia", "Seychelles", "Sierra Leone", "Singapore", "Slovakia",
    "Slovenia", "Solomon Islands", "Somalia", "Somaliland", "South Africa", "South Korea",
    "South Ossetia", "South Sudan", "Spain", "Sri Lanka", "Sudan", "Sudan, South", "Suriname",
    "Swaziland", "Sweden", "Switzerland", "Syria", "Taiwan", "Tajikistan", "Tanzania", "Thailand",
    "The Bahamas", "The Gambia", "Timor-Leste", "Togo", "Tonga", "Transnistria",
    "Trinidad and Tobago", "Tunisia", "Turkey", "Turkmenistan", "Tuvalu", "Uganda", "Ukraine",
    "United Arab Emirates", "United Kingdom", "United States", "Uruguay", "Uzbekistan", "Vanuatu",
    "Vatican City", "Venezuela", "Vietnam", "Yemen", "Zambia", "Zimbabwe",
];

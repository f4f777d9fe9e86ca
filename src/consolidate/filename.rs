use chrono::NaiveDate;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// `NAME_SURNAME - ATENDIMENTOS - DD-MM-YY[YY].xlsx|xlsm`
const CHILD_NAME_PATTERN: &str = r"(?i)^([A-ZÇÃÕÉÊÁÍÓÚ]+)_[A-ZÇÃÕÉÊÁÍÓÚ]+ - ATENDIMENTOS.{0,3}(\d{2}-\d{2}-\d{2}|\d{2}-\d{2}-\d{4})\.xls[xm]$";

/// Human-readable form of the pattern, used in log lines
pub const EXPECTED_PATTERN: &str = "NOME_SOBRENOME - ATENDIMENTOS - DD-MM-AA.xlsx";

fn child_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(CHILD_NAME_PATTERN).expect("child name pattern is valid"))
}

/// What a valid child file name tells us
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    /// First name token, upper-cased
    pub person: String,
    /// `None` when the date text matches the pattern but is not a real date
    pub date: Option<NaiveDate>,
}

/// Parse the base name of `path`; `None` if it does not follow the pattern
pub fn parse_child_name(path: &Path) -> Option<ParsedName> {
    let name = path.file_name()?.to_str()?;
    parse_file_name(name)
}

pub fn parse_file_name(name: &str) -> Option<ParsedName> {
    let caps = child_name_regex().captures(name)?;
    let person = caps.get(1)?.as_str().to_uppercase();
    let date = parse_file_date(caps.get(2)?.as_str());

    Some(ParsedName { person, date })
}

/// Two-digit years use `%d-%m-%y`, everything else `%d-%m-%Y`
fn parse_file_date(text: &str) -> Option<NaiveDate> {
    let year_len = text.rsplit('-').next().map(str::len).unwrap_or(0);
    let format = if year_len == 2 { "%d-%m-%y" } else { "%d-%m-%Y" };
    NaiveDate::parse_from_str(text, format).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_name() {
        let parsed = parse_file_name("ANA_SILVA - ATENDIMENTOS - 01-02-24.xlsx").unwrap();
        assert_eq!(parsed.person, "ANA");
        assert_eq!(parsed.date, NaiveDate::from_ymd_opt(2024, 2, 1));
    }

    #[test]
    fn test_both_workbook_extensions_accepted() {
        for ext in ["xlsx", "xlsm", "XLSX", "Xlsm"] {
            let name = format!("ANA_SILVA - ATENDIMENTOS - 01-02-24.{}", ext);
            let parsed = parse_file_name(&name).unwrap();
            assert_eq!(parsed.person, "ANA");
            assert_eq!(parsed.date, NaiveDate::from_ymd_opt(2024, 2, 1));
        }
    }

    #[test]
    fn test_two_and_four_digit_years_agree() {
        let short = parse_file_name("ANA_SILVA - ATENDIMENTOS - 15-03-24.xlsx").unwrap();
        let long = parse_file_name("ANA_SILVA - ATENDIMENTOS - 15-03-2024.xlsm").unwrap();
        assert_eq!(short, long);
    }

    #[test]
    fn test_case_insensitive_and_accents() {
        let parsed = parse_file_name("joão_conceição - atendimentos 01-02-2024.XLSX").unwrap();
        assert_eq!(parsed.person, "JOÃO");
    }

    #[test]
    fn test_impossible_date_keeps_file_valid() {
        let parsed = parse_file_name("ANA_SILVA - ATENDIMENTOS - 31-02-24.xlsx").unwrap();
        assert_eq!(parsed.person, "ANA");
        assert_eq!(parsed.date, None);
    }

    #[test]
    fn test_invalid_names() {
        for name in [
            "BOB_JONES.xlsx",
            "ANA SILVA - ATENDIMENTOS - 01-02-24.xlsx",
            "ANA_SILVA - ATENDIMENTOS.xlsx",
            "ANA_SILVA - ATENDIMENTOS - 01-02-24.csv",
            "ANA_SILVA - ATENDIMENTOS - 01-02-24.xls",
            "ANA_SILVA - ATENDIMENTOS - 01-02-24.xlsb",
            "ANA_SILVA - ATENDIMENTOS - 1-2-24.xlsx",
            "ANA_SILVA - RELATORIO - 01-02-24.xlsx",
            "ANA_SILVA - ATENDIMENTOS - 01-02-245.xlsx",
            "~$ANA_SILVA - ATENDIMENTOS - 01-02-24.xlsx",
        ] {
            assert!(parse_file_name(name).is_none(), "{} should be invalid", name);
        }
    }

    #[test]
    fn test_parse_child_name_uses_base_name() {
        let path = Path::new("/data/filhas/BIA_COSTA - ATENDIMENTOS - 05-06-2023.xlsx");
        let parsed = parse_child_name(path).unwrap();
        assert_eq!(parsed.person, "BIA");
        assert_eq!(parsed.date, NaiveDate::from_ymd_opt(2023, 6, 5));
    }
}

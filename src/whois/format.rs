// Result formatter - fixed width "Label: value" lines

use std::fmt::Display;

/// Column width of the label, including its trailing colon
const LABEL_WIDTH: usize = 20;

/// Format one labeled field.
///
/// Returns an empty string when the value renders empty so the field is left out
/// of the response entirely.
pub fn format_field(label: &str, value: impl Display) -> String {
    let value = value.to_string();
    if value.is_empty() {
        return String::new();
    }

    format!(
        "{:<width$} {}\r\n",
        format!("{}:", label),
        value.trim(),
        width = LABEL_WIDTH
    )
}

/// Append a field to a response, skipping it when empty
pub fn push_field(out: &mut String, label: &str, value: impl Display) {
    out.push_str(&format_field(label, value));
}

/// Append an optional field; `None` and empty strings are both left out
pub fn push_optional(out: &mut String, label: &str, value: Option<&str>) {
    if let Some(value) = value {
        push_field(out, label, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_field_pads_label() {
        assert_eq!(
            format_field("Prefix", "192.0.2.0/24"),
            "Prefix:              192.0.2.0/24\r\n"
        );
        assert_eq!(
            format_field("BgpLargeCommunities", "1:2:3"),
            "BgpLargeCommunities: 1:2:3\r\n"
        );
    }

    #[test]
    fn test_format_field_long_label_is_not_truncated() {
        assert_eq!(
            format_field("AVeryLongLabelIndeedHere", "x"),
            "AVeryLongLabelIndeedHere: x\r\n"
        );
    }

    #[test]
    fn test_format_field_trims_value() {
        assert_eq!(
            format_field("BgpAsPath", " 64501 64500 "),
            "BgpAsPath:           64501 64500\r\n"
        );
    }

    #[test]
    fn test_empty_value_is_omitted() {
        assert_eq!(format_field("BgpLabels", ""), "");

        let mut out = String::new();
        push_optional(&mut out, "PrefixCity", None);
        push_optional(&mut out, "PrefixCountry", Some(""));
        assert!(out.is_empty());
    }

    #[test]
    fn test_numbers_are_rendered() {
        assert_eq!(format_field("BgpMed", 0), "BgpMed:              0\r\n");
    }
}

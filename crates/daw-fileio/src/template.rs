//! Filename templating (spec §4.I), grounded on
//! `FilenameTemplateProcessor`: literal `{key}` substitution plus
//! filesystem-safe sanitization.

use crate::format::AudioFormat;
use std::collections::BTreeMap;

const INVALID_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

pub fn process_template(template: &str, variables: &BTreeMap<String, String>) -> String {
    let mut result = template.to_string();
    for (key, value) in variables {
        let placeholder = format!("{{{key}}}");
        result = result.replace(&placeholder, value);
    }
    sanitize_filename(&result)
}

/// Build the standard variable set: `{project}`, `{track_name}`,
/// `{timestamp}`, `{format}`, `{date}` (YYYYMMDD prefix of the timestamp).
pub fn default_variables(project_name: &str, track_name: &str, format: AudioFormat, timestamp: &str) -> BTreeMap<String, String> {
    let mut variables = BTreeMap::new();
    variables.insert("project".to_string(), if project_name.is_empty() { "Project".to_string() } else { project_name.to_string() });
    variables.insert("track_name".to_string(), if track_name.is_empty() { "Master".to_string() } else { track_name.to_string() });
    variables.insert("timestamp".to_string(), timestamp.to_string());
    variables.insert("format".to_string(), format.name().to_string());
    variables.insert("date".to_string(), timestamp.chars().take(8).collect());
    variables
}

pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name.chars().map(|c| if INVALID_CHARS.contains(&c) { '_' } else { c }).collect();
    let trimmed = replaced.trim_matches(|c: char| c == ' ' || c == '\t' || c == '.');
    if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_known_placeholders() {
        let mut vars = BTreeMap::new();
        vars.insert("project".to_string(), "Song".to_string());
        vars.insert("track_name".to_string(), "Vocals".to_string());
        let rendered = process_template("{project}_{track_name}", &vars);
        assert_eq!(rendered, "Song_Vocals");
    }

    #[test]
    fn sanitizes_invalid_characters_and_trims() {
        assert_eq!(sanitize_filename("  ..Song: Take/1?.. "), "Song_ Take_1_");
    }

    #[test]
    fn empty_result_falls_back_to_untitled() {
        assert_eq!(sanitize_filename("   ..."), "untitled");
    }

    #[test]
    fn default_variables_derive_date_from_timestamp() {
        let vars = default_variables("", "", AudioFormat::WavPcm16, "20260801_120000");
        assert_eq!(vars.get("project").unwrap(), "Project");
        assert_eq!(vars.get("date").unwrap(), "20260801");
    }
}

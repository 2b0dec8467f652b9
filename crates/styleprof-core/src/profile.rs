//! Style profile: the five canonical narrative sections and their assembly.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Minimum usable findings a section must carry.
pub const MIN_FINDINGS: usize = 2;
/// Findings beyond this count are dropped.
pub const MAX_FINDINGS: usize = 6;

/// The five profile sections, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionName {
    Voice,
    Themes,
    Values,
    EmotionalTone,
    Relatability,
}

impl SectionName {
    /// Every section in canonical order.
    pub const ALL: [SectionName; 5] = [
        SectionName::Voice,
        SectionName::Themes,
        SectionName::Values,
        SectionName::EmotionalTone,
        SectionName::Relatability,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SectionName::Voice => "voice",
            SectionName::Themes => "themes",
            SectionName::Values => "values",
            SectionName::EmotionalTone => "emotional_tone",
            SectionName::Relatability => "relatability",
        }
    }
}

impl fmt::Display for SectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SectionName::ALL
            .into_iter()
            .find(|n| n.as_str() == s)
            .ok_or_else(|| format!("unknown section '{s}'"))
    }
}

/// One rendered profile section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSection {
    pub name: SectionName,
    pub bullets: Vec<String>,
}

impl AnalysisSection {
    /// Format raw findings into bullets.
    ///
    /// Each finding is passed through [`format_finding`]; empty results and
    /// duplicates are dropped (first occurrence wins) and the list is capped
    /// at [`MAX_FINDINGS`]. Returns `None` when fewer than [`MIN_FINDINGS`]
    /// usable bullets remain.
    #[must_use]
    pub fn from_findings(name: SectionName, findings: &[String]) -> Option<Self> {
        let mut bullets: Vec<String> = Vec::with_capacity(findings.len().min(MAX_FINDINGS));
        for finding in findings {
            let formatted = format_finding(finding);
            if formatted.is_empty() || bullets.contains(&formatted) {
                continue;
            }
            bullets.push(formatted);
            if bullets.len() == MAX_FINDINGS {
                break;
            }
        }
        (bullets.len() >= MIN_FINDINGS).then_some(Self { name, bullets })
    }
}

/// Strip leading bullet glyphs and whitespace, then uppercase the first
/// alphabetic character.
#[must_use]
pub fn format_finding(raw: &str) -> String {
    let trimmed = raw
        .trim_start_matches(|c: char| matches!(c, '*' | '-' | '•') || c.is_whitespace())
        .trim_end();

    let mut out = String::with_capacity(trimmed.len());
    let mut capitalized = false;
    for c in trimmed.chars() {
        if !capitalized && c.is_alphabetic() {
            out.extend(c.to_uppercase());
            capitalized = true;
        } else {
            out.push(c);
        }
    }
    out
}

/// A section that could not be produced, with the recorded cause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingSection {
    pub name: SectionName,
    pub reason: String,
}

/// The assembled profile.
///
/// Sections are always held in canonical order with unique names. A profile
/// with any entry in `missing` is partial; [`StyleProfile::is_complete`] is
/// the flag callers check. Deserializing goes through
/// [`StyleProfile::assemble`], so stored profiles are held to the same rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredProfile")]
pub struct StyleProfile {
    sections: Vec<AnalysisSection>,
    missing: Vec<MissingSection>,
}

/// Wire shape of a [`StyleProfile`] before its invariants are restored.
#[derive(Deserialize)]
struct StoredProfile {
    #[serde(default)]
    sections: Vec<AnalysisSection>,
    #[serde(default)]
    missing: Vec<MissingSection>,
}

impl From<StoredProfile> for StyleProfile {
    fn from(stored: StoredProfile) -> Self {
        Self::assemble(stored.sections, stored.missing)
    }
}

/// Sidecar metadata written next to the markdown artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileMetadata {
    pub complete: bool,
    pub sections: Vec<SectionName>,
    pub missing: Vec<MissingSection>,
}

impl StyleProfile {
    /// Assemble sections and failures into canonical order.
    ///
    /// Duplicate section names keep the first occurrence. A section named in
    /// both lists is treated as present. Sections absent from both lists are
    /// recorded as missing with reason `"not produced"`.
    #[must_use]
    pub fn assemble(sections: Vec<AnalysisSection>, failures: Vec<MissingSection>) -> Self {
        let mut ordered = Vec::with_capacity(SectionName::ALL.len());
        let mut missing = Vec::new();

        for name in SectionName::ALL {
            if let Some(section) = sections.iter().find(|s| s.name == name) {
                ordered.push(section.clone());
            } else if let Some(failure) = failures.iter().find(|f| f.name == name) {
                missing.push(failure.clone());
            } else {
                missing.push(MissingSection {
                    name,
                    reason: "not produced".to_string(),
                });
            }
        }

        Self {
            sections: ordered,
            missing,
        }
    }

    #[must_use]
    pub fn sections(&self) -> &[AnalysisSection] {
        &self.sections
    }

    #[must_use]
    pub fn missing(&self) -> &[MissingSection] {
        &self.missing
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    #[must_use]
    pub fn section(&self, name: SectionName) -> Option<&AnalysisSection> {
        self.sections.iter().find(|s| s.name == name)
    }

    #[must_use]
    pub fn metadata(&self) -> ProfileMetadata {
        ProfileMetadata {
            complete: self.is_complete(),
            sections: self.sections.iter().map(|s| s.name).collect(),
            missing: self.missing.clone(),
        }
    }

    /// Render the `style-profile.md` artifact.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::from("# Style Profile\n\n");
        for section in &self.sections {
            out.push_str("## ");
            out.push_str(section.name.as_str());
            out.push_str(":\n");
            for bullet in &section.bullets {
                out.push_str("- ");
                out.push_str(bullet);
                out.push('\n');
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn findings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    fn section(name: SectionName) -> AnalysisSection {
        AnalysisSection::from_findings(name, &findings(&["one finding", "another finding"]))
            .expect("two findings form a section")
    }

    #[test]
    fn format_finding_strips_glyphs_and_capitalizes() {
        assert_eq!(format_finding("- uses metaphors"), "Uses metaphors");
        assert_eq!(format_finding("  • * speaks plainly  "), "Speaks plainly");
        assert_eq!(format_finding("\"quoted\" start"), "\"Quoted\" start");
        assert_eq!(format_finding("   "), "");
    }

    #[test]
    fn from_findings_dedups_and_caps() {
        let raw = findings(&["a", "- a", "b", "c", "d", "e", "f", "g"]);
        let section = AnalysisSection::from_findings(SectionName::Voice, &raw).unwrap();
        assert_eq!(section.bullets, vec!["A", "B", "C", "D", "E", "F"]);
    }

    #[test]
    fn deserialized_profile_is_reassembled() {
        let json = serde_json::json!({
            "sections": [
                { "name": "values", "bullets": ["Grit", "Honesty"] },
                { "name": "voice", "bullets": ["Plain", "Warm"] },
                { "name": "voice", "bullets": ["Shadowed", "Duplicate"] }
            ],
            "missing": []
        });
        let profile: StyleProfile = serde_json::from_value(json).unwrap();

        let names: Vec<SectionName> = profile.sections().iter().map(|s| s.name).collect();
        assert_eq!(names, vec![SectionName::Voice, SectionName::Values]);
        assert_eq!(profile.sections()[0].bullets, vec!["Plain", "Warm"]);
        assert_eq!(profile.missing().len(), 3);
        assert!(profile
            .missing()
            .iter()
            .all(|m| m.reason == "not produced"));
    }

    #[test]
    fn serialized_profile_reads_back_unchanged() {
        let profile = StyleProfile::assemble(
            vec![section(SectionName::Themes)],
            vec![MissingSection {
                name: SectionName::Voice,
                reason: "timed out".to_string(),
            }],
        );
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(serde_json::from_value::<StyleProfile>(json).unwrap(), profile);
    }

    #[test]
    fn from_findings_rejects_too_few() {
        let raw = findings(&["only one", "  ", "- "]);
        assert!(AnalysisSection::from_findings(SectionName::Voice, &raw).is_none());
    }

    #[test]
    fn assemble_orders_sections_canonically() {
        let sections = vec![
            section(SectionName::Relatability),
            section(SectionName::Voice),
            section(SectionName::EmotionalTone),
            section(SectionName::Values),
            section(SectionName::Themes),
        ];
        let profile = StyleProfile::assemble(sections, vec![]);
        let names: Vec<SectionName> = profile.sections().iter().map(|s| s.name).collect();
        assert_eq!(names, SectionName::ALL.to_vec());
        assert!(profile.is_complete());
    }

    #[test]
    fn assemble_flags_missing_sections() {
        let sections = vec![
            section(SectionName::Voice),
            section(SectionName::Themes),
            section(SectionName::EmotionalTone),
            section(SectionName::Relatability),
        ];
        let failures = vec![MissingSection {
            name: SectionName::Values,
            reason: "timed out".to_string(),
        }];
        let profile = StyleProfile::assemble(sections, failures);
        assert_eq!(profile.sections().len(), 4);
        assert!(!profile.is_complete());
        assert_eq!(profile.missing()[0].name, SectionName::Values);
        assert_eq!(profile.missing()[0].reason, "timed out");
    }

    #[test]
    fn assemble_records_unreported_sections() {
        let profile = StyleProfile::assemble(vec![section(SectionName::Voice)], vec![]);
        assert_eq!(profile.missing().len(), 4);
        assert!(profile.missing().iter().all(|m| m.reason == "not produced"));
    }

    #[test]
    fn markdown_has_headers_in_order() {
        let sections = SectionName::ALL.into_iter().map(section).collect();
        let md = StyleProfile::assemble(sections, vec![]).to_markdown();
        let headers: Vec<&str> = md.lines().filter(|l| l.starts_with("## ")).collect();
        assert_eq!(
            headers,
            vec![
                "## voice:",
                "## themes:",
                "## values:",
                "## emotional_tone:",
                "## relatability:"
            ]
        );
        assert!(md.contains("- One finding\n"));
    }

    #[test]
    fn metadata_reports_partiality() {
        let profile = StyleProfile::assemble(vec![section(SectionName::Voice)], vec![]);
        let meta = profile.metadata();
        assert!(!meta.complete);
        assert_eq!(meta.sections, vec![SectionName::Voice]);
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["missing"][0]["name"], "themes");
    }

    #[test]
    fn section_name_round_trips_through_str() {
        for name in SectionName::ALL {
            assert_eq!(name.as_str().parse::<SectionName>(), Ok(name));
        }
        assert!("tone".parse::<SectionName>().is_err());
    }
}

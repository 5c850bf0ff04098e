//! Checks file and command-line merging.
//!
//! A checks file is TOML:
//!
//! ```toml
//! shop_id = "shop-1"
//! environment = "staging"
//! result_size = 200
//!
//! [[groups]]
//! variations = ["hdr10+", "hdr 10+"]
//!
//! [[groups]]
//! variations = ["tv", "television"]
//! match_mode = "whole_word"
//! ```

use anyhow::{bail, Context, Result};
use assortcheck_backend_search::SearchApiConfig;
use assortcheck_model::{
    AnalysisError, AnalysisRequest, ConceptGroup, Environment, MatchMode, DEFAULT_RESULT_SIZE,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChecksFile {
    pub shop_id: Option<String>,
    pub environment: Option<Environment>,
    pub result_size: Option<u32>,
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub groups: Vec<GroupEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupEntry {
    pub variations: Vec<String>,
    #[serde(default)]
    pub match_mode: MatchMode,
}

impl ChecksFile {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read checks file: {}", path.display()))?;
        Self::parse(&raw)
            .with_context(|| format!("Failed to parse checks file: {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }
}

/// Options shared by every subcommand, before merging with a checks file.
#[derive(Debug, Default, Clone)]
pub struct RunOptions {
    pub keyword: String,
    pub shop_id: Option<String>,
    pub environment: Option<Environment>,
    pub result_size: Option<u32>,
    pub groups: Vec<String>,
    pub config: Option<PathBuf>,
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Parse a `--group` value: `[contains:|word:]variation, variation, ...`.
///
/// Without a recognized mode prefix the whole value is a contains group.
pub fn parse_group_arg(index: usize, arg: &str) -> Result<ConceptGroup, AnalysisError> {
    let (mode, variations) = match arg.split_once(':') {
        Some((prefix, rest)) => match prefix.parse::<MatchMode>() {
            Ok(mode) => (mode, rest),
            Err(_) => (MatchMode::Contains, arg),
        },
        None => (MatchMode::Contains, arg),
    };
    ConceptGroup::parse(index, variations, mode)
}

/// Merge a checks file with command-line options; flags win.
pub fn resolve(options: &RunOptions, file: ChecksFile) -> Result<(AnalysisRequest, SearchApiConfig)> {
    let groups = if options.groups.is_empty() {
        file.groups
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                let group = ConceptGroup::new(entry.variations, entry.match_mode);
                group.validate(index).map(|_| group)
            })
            .collect::<Result<Vec<_>, _>>()?
    } else {
        options
            .groups
            .iter()
            .enumerate()
            .map(|(index, arg)| parse_group_arg(index, arg))
            .collect::<Result<Vec<_>, _>>()?
    };

    let Some(shop_id) = options.shop_id.clone().or(file.shop_id) else {
        bail!("A shop id is required (--shop-id or shop_id in the checks file)");
    };

    let request = AnalysisRequest::new(shop_id, options.keyword.as_str())
        .with_environment(options.environment.or(file.environment).unwrap_or_default())
        .with_result_size(
            options
                .result_size
                .or(file.result_size)
                .unwrap_or(DEFAULT_RESULT_SIZE),
        )
        .with_groups(groups);
    request.validate()?;

    let defaults = SearchApiConfig::default();
    let api = SearchApiConfig {
        base_url: options.base_url.clone().or(file.base_url),
        timeout_secs: options
            .timeout_secs
            .or(file.timeout_secs)
            .unwrap_or(defaults.timeout_secs),
    };

    Ok((request, api))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_group_arg_modes() {
        let g = parse_group_arg(0, "word:TV, Television").unwrap();
        assert_eq!(g.match_mode, MatchMode::WholeWord);
        assert_eq!(g.variations, vec!["tv", "television"]);

        let g = parse_group_arg(0, "contains:hdr10+").unwrap();
        assert_eq!(g.match_mode, MatchMode::Contains);
        assert_eq!(g.variations, vec!["hdr10+"]);

        let g = parse_group_arg(0, "hdr10+, hdr 10+").unwrap();
        assert_eq!(g.match_mode, MatchMode::Contains);
        assert_eq!(g.variations, vec!["hdr10+", "hdr 10+"]);
    }

    #[test]
    fn test_parse_group_arg_unknown_prefix_is_literal() {
        let g = parse_group_arg(0, "ratio:16:9").unwrap();
        assert_eq!(g.match_mode, MatchMode::Contains);
        assert_eq!(g.variations, vec!["ratio:16:9"]);
    }

    #[test]
    fn test_parse_group_arg_blank() {
        assert!(matches!(
            parse_group_arg(1, "word: , "),
            Err(AnalysisError::InvalidGroup { index: 1 })
        ));
    }

    #[test]
    fn test_checks_file_parse() {
        let file = ChecksFile::parse(
            r#"
shop_id = "shop-9"
environment = "staging"
result_size = 200

[[groups]]
variations = ["HDR10+", "hdr 10+"]

[[groups]]
variations = ["tv"]
match_mode = "whole_word"
"#,
        )
        .unwrap();

        let options = RunOptions {
            keyword: "samsung tv".into(),
            ..Default::default()
        };
        let (request, api) = resolve(&options, file).unwrap();

        assert_eq!(request.shop_id, "shop-9");
        assert_eq!(request.environment, Environment::Staging);
        assert_eq!(request.result_size, 200);
        assert_eq!(request.groups.len(), 2);
        assert_eq!(request.groups[0].variations, vec!["hdr10+", "hdr 10+"]);
        assert_eq!(request.groups[1].match_mode, MatchMode::WholeWord);
        assert_eq!(api.timeout_secs, 30);
        assert_eq!(api.base_url, None);
    }

    #[test]
    fn test_flags_override_file() {
        let file = ChecksFile::parse(
            r#"
shop_id = "shop-9"
result_size = 200
[[groups]]
variations = ["oled"]
"#,
        )
        .unwrap();

        let options = RunOptions {
            keyword: "tv".into(),
            shop_id: Some("shop-1".into()),
            result_size: Some(50),
            groups: vec!["word:tv".into()],
            base_url: Some("http://localhost:9000".into()),
            ..Default::default()
        };
        let (request, api) = resolve(&options, file).unwrap();

        assert_eq!(request.shop_id, "shop-1");
        assert_eq!(request.result_size, 50);
        assert_eq!(request.groups.len(), 1);
        assert_eq!(request.groups[0].variations, vec!["tv"]);
        assert_eq!(api.base_url.as_deref(), Some("http://localhost:9000"));
    }

    #[test]
    fn test_missing_shop_id() {
        let options = RunOptions {
            keyword: "tv".into(),
            groups: vec!["tv".into()],
            ..Default::default()
        };
        assert!(resolve(&options, ChecksFile::default()).is_err());
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(ChecksFile::parse("shop = \"x\"").is_err());
    }
}

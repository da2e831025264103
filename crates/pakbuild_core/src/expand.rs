//! `{name}` variable substitution and `@alias` path lists.

use crate::error::{Error, Result};
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::sync::OnceLock;

/// Maximum nesting for variables and aliases before a reference is considered circular.
pub const DEFAULT_MAX_DEPTH: usize = 5;

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{([^{}]+)\}").unwrap())
}

/// Replaces every `{name}` in `value` with the recursively expanded `variables[name]`.
///
/// Unknown names are left in place. Fails with
/// [`Error::RecursionLimitExceeded`] once `max_depth` reaches zero, which is
/// how circular references surface.
pub fn expand_variables(
    value: &str,
    variables: &HashMap<String, String>,
    max_depth: usize,
) -> Result<String> {
    if max_depth == 0 {
        return Err(Error::RecursionLimitExceeded {
            value: value.to_string(),
        });
    }

    let mut expanded = value.to_string();
    for captures in placeholder_regex().captures_iter(value) {
        let name = &captures[1];
        if let Some(raw) = variables.get(name) {
            let inner = expand_variables(raw, variables, max_depth - 1)?;
            expanded = expanded.replace(&captures[0], &inner);
        }
    }

    Ok(expanded)
}

/// Resolves a raw path list where `@name` entries pull in alias `name`.
///
/// Aliases may reference other aliases. Unknown aliases are reported and
/// dropped; every other entry is variable-expanded.
pub fn resolve_alias_list(
    items: &[String],
    variables: &HashMap<String, String>,
    aliases: &HashMap<String, Vec<String>>,
) -> Result<BTreeSet<String>> {
    let mut resolved = BTreeSet::new();
    resolve_alias_list_into(items, variables, aliases, DEFAULT_MAX_DEPTH, &mut resolved)?;
    Ok(resolved)
}

fn resolve_alias_list_into(
    items: &[String],
    variables: &HashMap<String, String>,
    aliases: &HashMap<String, Vec<String>>,
    depth: usize,
    resolved: &mut BTreeSet<String>,
) -> Result<()> {
    for item in items {
        let Some(alias_name) = item.strip_prefix('@') else {
            resolved.insert(expand_variables(item, variables, DEFAULT_MAX_DEPTH)?);
            continue;
        };

        match aliases.get(alias_name) {
            Some(_) if depth == 0 => {
                return Err(Error::RecursionLimitExceeded {
                    value: item.clone(),
                });
            }
            Some(entries) => {
                resolve_alias_list_into(entries, variables, aliases, depth - 1, resolved)?;
            }
            None => {
                tracing::warn!("Alias '@{}' not found in configuration", alias_name);
            }
        }
    }

    Ok(())
}

/// Variables and aliases of a configuration, applied together.
#[derive(Debug, Clone, Default)]
pub struct Expander {
    variables: HashMap<String, String>,
    aliases: HashMap<String, Vec<String>>,
}

impl Expander {
    pub fn new(variables: HashMap<String, String>, aliases: HashMap<String, Vec<String>>) -> Self {
        Self { variables, aliases }
    }

    pub fn expand(&self, value: &str) -> Result<String> {
        expand_variables(value, &self.variables, DEFAULT_MAX_DEPTH)
    }

    pub fn resolve_list(&self, items: &[String]) -> Result<BTreeSet<String>> {
        resolve_alias_list(items, &self.variables, &self.aliases)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_expand_nested_variables() {
        let variables = vars(&[("root", "{mods}/Weapons"), ("mods", "_Mods")]);

        let expanded = expand_variables("{root}/Rifle", &variables, DEFAULT_MAX_DEPTH).unwrap();
        assert_eq!(expanded, "_Mods/Weapons/Rifle");
    }

    #[test]
    fn test_expand_repeated_placeholder() {
        let variables = vars(&[("a", "x")]);

        let expanded = expand_variables("{a}/{a}", &variables, DEFAULT_MAX_DEPTH).unwrap();
        assert_eq!(expanded, "x/x");
    }

    #[test]
    fn test_unknown_variable_left_in_place() {
        let expanded = expand_variables("{missing}/A", &HashMap::new(), DEFAULT_MAX_DEPTH).unwrap();
        assert_eq!(expanded, "{missing}/A");
    }

    #[test]
    fn test_circular_variables_fail() {
        let variables = vars(&[("a", "{b}"), ("b", "{a}")]);

        let err = expand_variables("{a}", &variables, DEFAULT_MAX_DEPTH).unwrap_err();
        assert!(matches!(err, Error::RecursionLimitExceeded { .. }));
    }

    #[test]
    fn test_depth_limit_is_exact() {
        // Four levels of nesting fit in a depth of five, five levels do not.
        let variables = vars(&[("a", "{b}"), ("b", "{c}"), ("c", "{d}"), ("d", "end")]);
        assert_eq!(
            expand_variables("{a}", &variables, DEFAULT_MAX_DEPTH).unwrap(),
            "end"
        );

        let variables = vars(&[
            ("a", "{b}"),
            ("b", "{c}"),
            ("c", "{d}"),
            ("d", "{e}"),
            ("e", "end"),
        ]);
        assert!(expand_variables("{a}", &variables, DEFAULT_MAX_DEPTH).is_err());
    }

    #[test]
    fn test_alias_list_expands_recursively() {
        let variables = vars(&[("mods", "_Mods")]);
        let aliases = HashMap::from([
            ("weapons".to_string(), strings(&["{mods}/Weapons"])),
            ("all".to_string(), strings(&["@weapons", "{mods}/Hud"])),
        ]);

        let resolved = resolve_alias_list(&strings(&["@all", "Core/"]), &variables, &aliases).unwrap();
        assert_eq!(
            resolved.into_iter().collect::<Vec<_>>(),
            ["Core/", "_Mods/Hud", "_Mods/Weapons"]
        );
    }

    #[test]
    fn test_unknown_alias_dropped() {
        let resolved =
            resolve_alias_list(&strings(&["@nope", "A/"]), &HashMap::new(), &HashMap::new())
                .unwrap();
        assert_eq!(resolved.into_iter().collect::<Vec<_>>(), ["A/"]);
    }

    #[test]
    fn test_alias_cycle_fails() {
        let aliases = HashMap::from([
            ("a".to_string(), strings(&["@b"])),
            ("b".to_string(), strings(&["@a"])),
        ]);

        let err = resolve_alias_list(&strings(&["@a"]), &HashMap::new(), &aliases).unwrap_err();
        assert!(matches!(err, Error::RecursionLimitExceeded { .. }));
    }

    #[test]
    fn test_expander_bundles_variables_and_aliases() {
        let expander = Expander::new(
            vars(&[("mods", "_Mods")]),
            HashMap::from([("mods".to_string(), strings(&["A/", "B/"]))]),
        );

        assert_eq!(expander.expand("{mods}/X").unwrap(), "_Mods/X");
        assert_eq!(
            expander.resolve_list(&strings(&["@mods"])).unwrap().len(),
            2
        );
    }
}

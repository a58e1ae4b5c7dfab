use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;

use crate::selector::{Expr, parse};

/// Route table loaded from YAML:
///
/// ```yaml
/// routes:
///   adults:
///     filter: "age >= 18"
///   iplant:
///     filter: "tenant_id = 'iplantc.org'"
/// ```
#[derive(Debug, Deserialize, Serialize)]
pub struct RoutesConfig {
    pub routes: HashMap<String, RouteConfig>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RouteConfig {
    pub filter: String,
}

impl RoutesConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Compile every route selector up front so a bad filter fails at
    /// startup instead of mid-stream.
    pub fn compile(&self) -> anyhow::Result<CompiledConfig> {
        let mut routes = self
            .routes
            .iter()
            .map(|(name, route)| {
                let filter = parse(&route.filter)
                    .with_context(|| format!("Config: invalid filter for route '{name}'"))?;
                Ok(CompiledRoute {
                    name: name.clone(),
                    filter,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        // Deterministic route order for output annotations
        routes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(CompiledConfig { routes })
    }
}

/// A route with its selector parsed into an expression tree.
#[derive(Debug, Clone)]
pub struct CompiledRoute {
    pub name: String,
    pub filter: Expr,
}

#[derive(Debug, Clone)]
pub struct CompiledConfig {
    pub routes: Vec<CompiledRoute>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_yaml(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::with_suffix(".yaml").unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn loads_and_compiles_routes() {
        let file = write_yaml(
            "routes:\n  adults:\n    filter: \"age >= 18\"\n  uk:\n    filter: \"country = 'UK'\"\n",
        );
        let config = RoutesConfig::load(file.path()).unwrap();
        let compiled = config.compile().unwrap();
        assert_eq!(compiled.routes.len(), 2);
        // Sorted by name
        assert_eq!(compiled.routes[0].name, "adults");
        assert_eq!(compiled.routes[1].name, "uk");
    }

    #[test]
    fn bad_filter_fails_with_route_name() {
        let file = write_yaml("routes:\n  broken:\n    filter: \"age >= \"\n");
        let config = RoutesConfig::load(file.path()).unwrap();
        let err = config.compile().unwrap_err();
        assert!(format!("{err:#}").contains("broken"));
    }
}

//! Property resolution for placeholder substitution
//!
//! A [`PropertyResolver`] is an ordered chain of [`PropertySource`]s. The first
//! source that knows a key wins. The standard chain is:
//!
//! 1. project metadata (`project.version`, `artifactId`, `project.name`, ...)
//! 2. explicit overrides from the command line
//! 3. the process environment
//! 4. the build property bag from the project configuration

use std::collections::BTreeMap;

/// A named key/value lookup
pub trait PropertySource: Send + Sync {
    /// Name used in diagnostics
    fn name(&self) -> &str;

    /// Look up a property
    fn lookup(&self, key: &str) -> Option<String>;
}

/// Build metadata exposed under fixed synthetic names
#[derive(Debug, Clone, Default)]
pub struct ProjectProperties {
    pub artifact_id: String,
    pub version: String,
    pub chart_name: String,
    pub chart_version: String,
}

impl PropertySource for ProjectProperties {
    fn name(&self) -> &str {
        "project"
    }

    fn lookup(&self, key: &str) -> Option<String> {
        match key {
            "project.version" => Some(self.version.clone()),
            "artifactId" | "project.artifactId" | "project.name" => Some(self.artifact_id.clone()),
            "chart.name" => Some(self.chart_name.clone()),
            "chart.version" => Some(self.chart_version.clone()),
            _ => None,
        }
    }
}

/// A fixed map of properties
#[derive(Debug, Clone, Default)]
pub struct MapSource {
    name: String,
    values: BTreeMap<String, String>,
}

impl MapSource {
    pub fn new(name: impl Into<String>, values: BTreeMap<String, String>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

impl PropertySource for MapSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookup(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Live view of the process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvironmentSource;

impl PropertySource for EnvironmentSource {
    fn name(&self) -> &str {
        "environment"
    }

    fn lookup(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// A successfully resolved property
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProperty {
    pub value: String,
    /// Name of the source that provided the value
    pub source: String,
}

/// Ordered chain of property sources
#[derive(Default)]
pub struct PropertyResolver {
    sources: Vec<Box<dyn PropertySource>>,
}

impl PropertyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Standard chain: project, overrides, environment, build properties
    pub fn standard(
        project: ProjectProperties,
        overrides: BTreeMap<String, String>,
        properties: BTreeMap<String, String>,
    ) -> Self {
        Self::new()
            .with_source(project)
            .with_source(MapSource::new("overrides", overrides))
            .with_source(EnvironmentSource)
            .with_source(MapSource::new("properties", properties))
    }

    /// Append a source with lower precedence than every existing one
    pub fn with_source(mut self, source: impl PropertySource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Resolve a property, first match wins
    pub fn resolve(&self, key: &str) -> Option<ResolvedProperty> {
        self.sources.iter().find_map(|source| {
            source.lookup(key).map(|value| ResolvedProperty {
                value,
                source: source.name().to_string(),
            })
        })
    }

    /// Names of the configured sources in precedence order
    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }
}

impl std::fmt::Debug for PropertyResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyResolver")
            .field("sources", &self.source_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> ProjectProperties {
        ProjectProperties {
            artifact_id: "my-service".to_string(),
            version: "1.2.3".to_string(),
            chart_name: "mychart".to_string(),
            chart_version: "1.2.3".to_string(),
        }
    }

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_synthetic_names() {
        let resolver = PropertyResolver::new().with_source(project());

        assert_eq!(resolver.resolve("project.version").unwrap().value, "1.2.3");
        assert_eq!(resolver.resolve("artifactId").unwrap().value, "my-service");
        assert_eq!(resolver.resolve("project.name").unwrap().value, "my-service");
        assert_eq!(resolver.resolve("chart.name").unwrap().value, "mychart");
        assert!(resolver.resolve("project.description").is_none());
    }

    #[test]
    fn test_first_source_wins() {
        let resolver = PropertyResolver::new()
            .with_source(project())
            .with_source(MapSource::new("overrides", map(&[("image.tag", "override")])))
            .with_source(MapSource::new(
                "properties",
                map(&[("image.tag", "bag"), ("project.version", "ignored")]),
            ));

        let tag = resolver.resolve("image.tag").unwrap();
        assert_eq!(tag.value, "override");
        assert_eq!(tag.source, "overrides");

        // Synthetic names shadow the property bag
        assert_eq!(resolver.resolve("project.version").unwrap().value, "1.2.3");
    }

    #[test]
    fn test_environment_between_overrides_and_properties() {
        // SAFETY: variable name is unique to this test
        unsafe { std::env::set_var("HELMDEPLOY_TEST_PROPERTY_ORDER", "from-env") };

        let resolver = PropertyResolver::standard(
            project(),
            BTreeMap::new(),
            map(&[("HELMDEPLOY_TEST_PROPERTY_ORDER", "from-bag")]),
        );
        let resolved = resolver.resolve("HELMDEPLOY_TEST_PROPERTY_ORDER").unwrap();
        assert_eq!(resolved.value, "from-env");
        assert_eq!(resolved.source, "environment");

        // SAFETY: see above
        unsafe { std::env::remove_var("HELMDEPLOY_TEST_PROPERTY_ORDER") };
    }

    #[test]
    fn test_source_names() {
        let resolver = PropertyResolver::standard(project(), BTreeMap::new(), BTreeMap::new());
        assert_eq!(
            resolver.source_names(),
            vec!["project", "overrides", "environment", "properties"]
        );
    }
}

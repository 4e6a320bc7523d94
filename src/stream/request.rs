use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role of a module within its pipeline, derived from its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleType {
    /// First module of a multi-module pipeline.
    Source,
    /// Any module strictly between the source and the sink.
    Processor,
    /// Last module of the pipeline; also the role of a lone module.
    Sink,
}

impl ModuleType {
    /// Role of the module at `index` in a pipeline of `count` modules.
    pub fn for_position(index: usize, count: usize) -> Self {
        if index + 1 >= count {
            ModuleType::Sink
        } else if index == 0 {
            ModuleType::Source
        } else {
            ModuleType::Processor
        }
    }

    /// Lowercase name used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleType::Source => "source",
            ModuleType::Processor => "processor",
            ModuleType::Sink => "sink",
        }
    }
}

impl fmt::Display for ModuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing a [`ModuleType`] from an unknown name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown module type '{0}'")]
pub struct UnknownModuleType(pub String);

impl FromStr for ModuleType {
    type Err = UnknownModuleType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "source" => Ok(ModuleType::Source),
            "processor" => Ok(ModuleType::Processor),
            "sink" => Ok(ModuleType::Sink),
            other => Err(UnknownModuleType(other.to_string())),
        }
    }
}

/// Immutable request to deploy one module of a stream.
///
/// `index` counts from the source end (source = 0). The parser returns these
/// in reverse pipeline order, sink first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleDeploymentRequest {
    module: String,
    group: String,
    index: usize,
    #[serde(rename = "type")]
    module_type: ModuleType,
    parameters: BTreeMap<String, String>,
}

impl ModuleDeploymentRequest {
    /// Construct a new deployment request.
    pub fn new(
        module: impl Into<String>,
        group: impl Into<String>,
        index: usize,
        module_type: ModuleType,
        parameters: BTreeMap<String, String>,
    ) -> Self {
        Self {
            module: module.into(),
            group: group.into(),
            index,
            module_type,
            parameters,
        }
    }

    /// Symbolic module name.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Name of the stream this module belongs to.
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Position in the pipeline, 0 at the source end.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Position-derived role.
    pub fn module_type(&self) -> ModuleType {
        self.module_type
    }

    /// Option values keyed by option name.
    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    /// Look up a single option value.
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }
}

impl fmt::Display for ModuleDeploymentRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}[{}] ({})",
            self.group, self.module, self.index, self.module_type
        )?;
        for (key, value) in &self.parameters {
            write!(f, " --{}={}", key, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lone_module_is_a_sink() {
        assert_eq!(ModuleType::for_position(0, 1), ModuleType::Sink);
    }

    #[test]
    fn roles_follow_position() {
        let roles: Vec<_> = (0..4).map(|i| ModuleType::for_position(i, 4)).collect();
        assert_eq!(
            roles,
            vec![
                ModuleType::Source,
                ModuleType::Processor,
                ModuleType::Processor,
                ModuleType::Sink,
            ]
        );
    }

    #[test]
    fn module_type_names_round_trip() {
        for ty in [ModuleType::Source, ModuleType::Processor, ModuleType::Sink] {
            assert_eq!(ty.as_str().parse::<ModuleType>(), Ok(ty));
        }
        assert_eq!(
            "job".parse::<ModuleType>(),
            Err(UnknownModuleType("job".to_string()))
        );
    }

    #[test]
    fn serializes_type_field_in_lowercase() {
        let mut parameters = BTreeMap::new();
        parameters.insert("port".to_string(), "9000".to_string());
        let request = ModuleDeploymentRequest::new("http", "ingest", 0, ModuleType::Source, parameters);

        let json = serde_json::to_value(&request).expect("serialize");
        assert_eq!(json["type"], "source");
        assert_eq!(json["module"], "http");
        assert_eq!(json["group"], "ingest");
        assert_eq!(json["index"], 0);
        assert_eq!(json["parameters"]["port"], "9000");

        let back: ModuleDeploymentRequest = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, request);
    }

    #[test]
    fn display_lists_parameters() {
        let mut parameters = BTreeMap::new();
        parameters.insert("z".to_string(), "3".to_string());
        let request = ModuleDeploymentRequest::new("bar", "test", 1, ModuleType::Sink, parameters);
        assert_eq!(request.to_string(), "test.bar[1] (sink) --z=3");
    }
}

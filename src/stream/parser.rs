use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use super::lexer::{Lexer, Token, TokenKind};
use super::request::{ModuleDeploymentRequest, ModuleType};
use super::{ParseError, ParseErrorKind, Result};
use crate::config::{DuplicateOptionPolicy, ParserConfig};

/// Parse a stream definition with the default parser settings.
pub fn parse(name: &str, definition: &str) -> Result<Vec<ModuleDeploymentRequest>> {
    StreamParser::new().parse(name, definition)
}

/// Parse the options of a single module segment with the default settings.
pub fn get_parameters(module: &str) -> Result<BTreeMap<String, String>> {
    StreamParser::new().get_parameters(module)
}

/// Turns stream definition text into module deployment requests.
///
/// The parser holds only its configuration and may be shared freely between
/// threads.
#[derive(Debug, Clone, Default)]
pub struct StreamParser {
    config: ParserConfig,
}

struct ParsedModule {
    name: String,
    parameters: BTreeMap<String, String>,
}

impl StreamParser {
    /// Create a parser with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a parser with explicit settings.
    pub fn with_config(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Parser settings in effect.
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parse `definition` into deployment requests belonging to stream `name`.
    ///
    /// The list is in reverse pipeline order (sink first, source last) while
    /// each request's `index` counts forward from the source. Either the whole
    /// list is returned or the first error found.
    pub fn parse(&self, name: &str, definition: &str) -> Result<Vec<ModuleDeploymentRequest>> {
        if name.trim().is_empty() {
            return Err(ParseError::new(
                ParseErrorKind::EmptyDefinition,
                name,
                0,
                "definition name must not be blank",
            ));
        }

        let lexer = self.lexer(definition);
        let modules = self.collect_modules(definition, lexer)?;
        let count = modules.len();

        let requests: Vec<_> = modules
            .into_iter()
            .enumerate()
            .rev()
            .map(|(index, module)| {
                ModuleDeploymentRequest::new(
                    module.name,
                    name,
                    index,
                    ModuleType::for_position(index, count),
                    module.parameters,
                )
            })
            .collect();

        tracing::debug!(definition = name, modules = count, "parsed stream definition");
        Ok(requests)
    }

    /// Parse the options of one module segment, e.g. `http --port=9000`.
    ///
    /// The segment must start with the module name; a module without options
    /// yields an empty map.
    pub fn get_parameters(&self, module: &str) -> Result<BTreeMap<String, String>> {
        let lexer = self.lexer(module).single_module();
        let mut modules = self.collect_modules(module, lexer)?;
        match modules.pop() {
            Some(parsed) if modules.is_empty() => Ok(parsed.parameters),
            _ => Err(ParseError::new(
                ParseErrorKind::UnexpectedToken,
                module,
                0,
                "expected exactly one module",
            )),
        }
    }

    fn lexer<'a>(&self, source: &'a str) -> Lexer<'a> {
        Lexer::new(source).allow_empty_values(self.config.allow_empty_values)
    }

    fn collect_modules(&self, source: &str, lexer: Lexer<'_>) -> Result<Vec<ParsedModule>> {
        if source.trim().is_empty() {
            return Err(ParseError::new(
                ParseErrorKind::EmptyDefinition,
                source,
                0,
                "definition is blank",
            ));
        }

        let mut modules = Vec::new();
        let mut current: Option<ParsedModule> = None;
        let mut last_pipe: Option<(String, usize)> = None;

        for token in lexer.tokenize()? {
            let Token { kind, text, offset } = token;
            match kind {
                TokenKind::Module(name) => {
                    current = Some(ParsedModule {
                        name,
                        parameters: BTreeMap::new(),
                    });
                }
                TokenKind::Option { key, value } => {
                    let Some(module) = current.as_mut() else {
                        return Err(ParseError::new(
                            ParseErrorKind::MalformedOption,
                            text,
                            offset,
                            "option must follow a module name",
                        ));
                    };
                    self.insert_option(module, key, value, text, offset)?;
                }
                TokenKind::Pipe => {
                    let Some(module) = current.take() else {
                        return Err(ParseError::new(
                            ParseErrorKind::MissingModule,
                            text,
                            offset,
                            "no module before '|'",
                        ));
                    };
                    modules.push(module);
                    last_pipe = Some((text, offset));
                }
            }
        }

        match current {
            Some(module) => modules.push(module),
            None => {
                if let Some((text, offset)) = last_pipe {
                    return Err(ParseError::new(
                        ParseErrorKind::MissingModule,
                        text,
                        offset,
                        "no module after '|'",
                    ));
                }
            }
        }

        if modules.is_empty() {
            return Err(ParseError::new(
                ParseErrorKind::EmptyDefinition,
                source,
                0,
                "definition contains no modules",
            ));
        }
        Ok(modules)
    }

    fn insert_option(
        &self,
        module: &mut ParsedModule,
        key: String,
        value: String,
        text: String,
        offset: usize,
    ) -> Result<()> {
        match module.parameters.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
            Entry::Occupied(mut slot) => match self.config.duplicate_options {
                DuplicateOptionPolicy::Reject => {
                    return Err(ParseError::new(
                        ParseErrorKind::DuplicateOption,
                        text,
                        offset,
                        format!(
                            "option '{}' is already set for module '{}'",
                            slot.key(),
                            module.name
                        ),
                    ));
                }
                DuplicateOptionPolicy::LastWins => {
                    tracing::warn!(
                        module = %module.name,
                        option = %slot.key(),
                        "duplicate option overrides earlier value"
                    );
                    slot.insert(value);
                }
            },
        }
        Ok(())
    }
}

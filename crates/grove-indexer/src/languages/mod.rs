//! Language extractors for different programming languages

pub mod c;
pub mod generic;
pub mod go;
pub mod java;
pub mod javascript;
pub mod patterns;
pub mod python;
pub mod rust;
pub mod syntax;

use crate::extractor::LanguageExtractor;
use crate::parser_pool::{Grammar, ParserPool};
use grove_core::Language;
use std::collections::HashMap;

/// Maps each supported language onto its extraction strategy.
pub struct LanguageRegistry {
    extractors: HashMap<Language, Box<dyn LanguageExtractor>>,
}

impl LanguageRegistry {
    /// Register every built-in strategy. Fails only if a pattern table does
    /// not compile.
    pub fn new(parser_pool: ParserPool) -> Result<Self, regex::Error> {
        let mut registry = Self {
            extractors: HashMap::new(),
        };

        registry.register(
            Language::Python,
            python::PythonExtractor::new(parser_pool.clone()),
        );
        registry.register(
            Language::JavaScript,
            javascript::JavaScriptExtractor::new(parser_pool.clone(), Language::JavaScript),
        );
        registry.register(
            Language::TypeScript,
            javascript::JavaScriptExtractor::new(parser_pool.clone(), Language::TypeScript),
        );
        registry.register(Language::Rust, rust::RustExtractor::new(parser_pool.clone()));
        registry.register(Language::Go, go::GoExtractor::new(parser_pool.clone()));
        registry.register(Language::Java, java::JavaExtractor::new(parser_pool.clone()));
        registry.register(Language::C, c::CExtractor::new(parser_pool.clone(), Grammar::C));
        registry.register(Language::Cpp, c::CExtractor::new(parser_pool, Grammar::Cpp));

        for table in patterns::TABLES {
            registry.register(table.language, generic::PatternExtractor::new(table)?);
        }

        Ok(registry)
    }

    pub fn register(&mut self, language: Language, extractor: impl LanguageExtractor + 'static) {
        self.extractors.insert(language, Box::new(extractor));
    }

    pub fn get(&self, language: Language) -> Option<&dyn LanguageExtractor> {
        self.extractors.get(&language).map(|e| e.as_ref())
    }
}

use crate::class_id::ClassIdType;
use crate::errors::{MapError, Result};
use regex::Regex;

/// Inclusion filters for catalog entries. An empty set admits everything.
#[derive(Debug, Clone, Default)]
pub struct Filters {
    names: Vec<Regex>,
    types: Vec<ClassIdType>,
    containers: Vec<Regex>,
}

fn compile<I, S>(patterns: I) -> Result<Vec<Regex>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    patterns
        .into_iter()
        .map(|p| {
            let pattern = p.as_ref();
            Regex::new(pattern).map_err(|source| MapError::InvalidFilter {
                pattern: pattern.to_string(),
                source,
            })
        })
        .collect()
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_names<I, S>(mut self, patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.names = compile(patterns)?;
        Ok(self)
    }

    pub fn with_types(mut self, types: impl IntoIterator<Item = ClassIdType>) -> Self {
        self.types = types.into_iter().collect();
        self
    }

    pub fn with_containers<I, S>(mut self, patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.containers = compile(patterns)?;
        Ok(self)
    }

    pub fn name_matches(&self, name: &str) -> bool {
        self.names.is_empty() || self.names.iter().any(|re| re.is_match(name))
    }

    pub fn type_matches(&self, class: ClassIdType) -> bool {
        self.types.is_empty() || self.types.contains(&class)
    }

    pub fn container_matches(&self, container: &str) -> bool {
        self.containers.is_empty() || self.containers.iter().any(|re| re.is_match(container))
    }
}

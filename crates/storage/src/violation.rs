use std::fmt;

/// Unique rules declared by the schema. `name()` matches the constraint name
/// used in the DDL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniqueConstraint {
    /// `(client_id, priority)`: the per-group rank rule.
    ClientPriority,
    /// `featurerequest.title`, global across clients.
    Title,
    ClientName,
    ProductAreaName,
}

impl UniqueConstraint {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ClientPriority => "featurerequest_client_id_priority_key",
            Self::Title => "featurerequest_title_key",
            Self::ClientName => "client_name_key",
            Self::ProductAreaName => "productarea_name_key",
        }
    }
}

/// Structured description of a rejected write.
///
/// For unique violations the store reports every declared unique rule the
/// offending row collides with, not only the first one the engine tripped.
/// An empty list means the store could not attribute the violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintViolation {
    Unique(Vec<UniqueConstraint>),
    ForeignKey,
    Check,
    NotNull,
    Other(i32),
}

impl ConstraintViolation {
    pub fn violates(&self, constraint: UniqueConstraint) -> bool {
        match self {
            Self::Unique(hit) => hit.contains(&constraint),
            _ => false,
        }
    }
}

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unique(hit) if hit.is_empty() => write!(f, "unique (unattributed)"),
            Self::Unique(hit) => {
                write!(f, "unique ")?;
                for (i, c) in hit.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", c.name())?;
                }
                Ok(())
            }
            Self::ForeignKey => write!(f, "foreign key"),
            Self::Check => write!(f, "check"),
            Self::NotNull => write!(f, "not null"),
            Self::Other(code) => write!(f, "sqlite extended code {code}"),
        }
    }
}

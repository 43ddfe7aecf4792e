use std::fmt;
use std::str::FromStr;

use crate::error::{CmsError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Populate {
    /// `populate=*`: every first-level relation, component and upload.
    #[default]
    All,
    Fields(Vec<String>),
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = CmsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(CmsError::Config(format!("unknown sort order '{}'", other))),
        }
    }
}

/// Strapi filter operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Contains,
    ContainsI,
    StartsWith,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    Null,
    NotNull,
}

impl FilterOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "$eq",
            FilterOp::Ne => "$ne",
            FilterOp::Contains => "$contains",
            FilterOp::ContainsI => "$containsi",
            FilterOp::StartsWith => "$startsWith",
            FilterOp::Lt => "$lt",
            FilterOp::Lte => "$lte",
            FilterOp::Gt => "$gt",
            FilterOp::Gte => "$gte",
            FilterOp::In => "$in",
            FilterOp::Null => "$null",
            FilterOp::NotNull => "$notNull",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    /// Dotted path through relations, e.g. `category.name`.
    pub field: String,
    pub op: FilterOp,
    pub value: String,
}

impl Filter {
    fn key(&self) -> String {
        let path: String = self.field.split('.').map(|part| format!("[{}]", part)).collect();
        format!("filters{}[{}]", path, self.op.as_str())
    }
}

/// Parses CLI filters of the form `field=value` (equality) or
/// `field~value` (case-insensitive contains).
impl FromStr for Filter {
    type Err = CmsError;

    fn from_str(s: &str) -> Result<Self> {
        let (field, op, value) = if let Some((f, v)) = s.split_once('~') {
            (f, FilterOp::ContainsI, v)
        } else if let Some((f, v)) = s.split_once('=') {
            (f, FilterOp::Eq, v)
        } else {
            return Err(CmsError::Config(format!(
                "filter '{}' must look like field=value or field~value",
                s
            )));
        };
        if field.trim().is_empty() {
            return Err(CmsError::Config(format!("filter '{}' has no field", s)));
        }
        Ok(Filter {
            field: field.trim().to_string(),
            op,
            value: value.to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicationState {
    Live,
    Preview,
}

/// Query-string parameters for a content request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentQuery {
    pub populate: Populate,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub filters: Vec<Filter>,
    pub sort: Vec<(String, SortOrder)>,
    pub locale: Option<String>,
    pub publication_state: Option<PublicationState>,
}

impl ContentQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn populate(mut self, populate: Populate) -> Self {
        self.populate = populate;
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn filter(mut self, field: impl Into<String>, op: FilterOp, value: impl fmt::Display) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            op,
            value: value.to_string(),
        });
        self
    }

    pub fn where_eq(self, field: impl Into<String>, value: impl fmt::Display) -> Self {
        self.filter(field, FilterOp::Eq, value)
    }

    pub fn sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort.push((field.into(), order));
        self
    }

    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn publication_state(mut self, state: PublicationState) -> Self {
        self.publication_state = Some(state);
        self
    }

    /// Unencoded key/value pairs; the transport does the percent-encoding.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();

        match &self.populate {
            Populate::All => pairs.push(("populate".to_string(), "*".to_string())),
            Populate::Fields(fields) => {
                for (i, field) in fields.iter().enumerate() {
                    pairs.push((format!("populate[{}]", i), field.clone()));
                }
            }
            Populate::None => {}
        }

        if let Some(page) = self.page {
            pairs.push(("pagination[page]".to_string(), page.to_string()));
        }
        if let Some(page_size) = self.page_size {
            pairs.push(("pagination[pageSize]".to_string(), page_size.to_string()));
        }

        for filter in &self.filters {
            pairs.push((filter.key(), filter.value.clone()));
        }

        for (i, (field, order)) in self.sort.iter().enumerate() {
            pairs.push((format!("sort[{}]", i), format!("{}:{}", field, order.as_str())));
        }

        if let Some(locale) = &self.locale {
            pairs.push(("locale".to_string(), locale.clone()));
        }
        if let Some(state) = self.publication_state {
            let state = match state {
                PublicationState::Live => "live",
                PublicationState::Preview => "preview",
            };
            pairs.push(("publicationState".to_string(), state.to_string()));
        }

        pairs
    }
}

/// Parses `field` or `field:asc|desc`.
pub fn parse_sort(s: &str) -> Result<(String, SortOrder)> {
    match s.split_once(':') {
        Some((field, order)) => Ok((field.trim().to_string(), order.trim().parse()?)),
        None => Ok((s.trim().to_string(), SortOrder::Asc)),
    }
}

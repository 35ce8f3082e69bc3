use crate::dto::ListResponse;
use crate::errors::ApiError;
use ridgeline_model::Locale;
use std::collections::BTreeMap;

pub const DEFAULT_LIST_LIMIT: usize = 50;
pub const MAX_LIST_LIMIT: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListParams {
    pub locale: Option<Locale>,
    pub published: Option<bool>,
    pub limit: usize,
    pub offset: usize,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            locale: None,
            published: None,
            limit: DEFAULT_LIST_LIMIT,
            offset: 0,
        }
    }
}

impl ListParams {
    /// Slice `items` into one response page.
    #[must_use]
    pub fn paginate<T>(&self, items: Vec<T>) -> ListResponse<T> {
        let total = items.len();
        let items = items
            .into_iter()
            .skip(self.offset)
            .take(self.limit)
            .collect();
        ListResponse {
            items,
            total,
            limit: self.limit,
            offset: self.offset,
        }
    }
}

pub fn parse_list_params(query: &BTreeMap<String, String>) -> Result<ListParams, ApiError> {
    let limit = match query.get("limit") {
        Some(raw) => {
            let value = raw
                .parse::<usize>()
                .map_err(|_| ApiError::invalid_param("limit", raw))?;
            if value == 0 || value > MAX_LIST_LIMIT {
                return Err(ApiError::invalid_param("limit", raw));
            }
            value
        }
        None => DEFAULT_LIST_LIMIT,
    };
    let offset = match query.get("offset") {
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| ApiError::invalid_param("offset", raw))?,
        None => 0,
    };
    let published = match query.get("published").map(String::as_str) {
        None => None,
        Some("1" | "true") => Some(true),
        Some("0" | "false") => Some(false),
        Some(raw) => return Err(ApiError::invalid_param("published", raw)),
    };
    let locale = query
        .get("locale")
        .map(|raw| Locale::parse(raw).map_err(|_| ApiError::invalid_param("locale", raw)))
        .transpose()?;
    Ok(ListParams {
        locale,
        published,
        limit,
        offset,
    })
}

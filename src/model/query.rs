use crate::ConfigError;
use clap::ValueEnum;
use serde::Deserialize;
use url::Url;

/// Item condition filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ItemCondition {
    New,
    OpenBox,
    Refurbished,
    Used,
    ForParts,
}

impl ItemCondition {
    /// Condition code understood by the search endpoint
    pub fn code(&self) -> &'static str {
        match self {
            Self::New => "1000",
            Self::OpenBox => "1500",
            Self::Refurbished => "2500",
            Self::Used => "3000",
            Self::ForParts => "7000",
        }
    }
}

/// Result ordering requested from the search endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    #[default]
    BestMatch,
    PriceLowest,
    PriceHighest,
    EndingSoonest,
    NewlyListed,
    Nearest,
}

impl SortOrder {
    /// Sort code understood by the search endpoint
    pub fn code(&self) -> &'static str {
        match self {
            Self::BestMatch => "12",
            Self::PriceLowest => "15",
            Self::PriceHighest => "16",
            Self::EndingSoonest => "1",
            Self::NewlyListed => "10",
            Self::Nearest => "7",
        }
    }
}

/// Optional narrowing of a search
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilters {
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub condition: Option<ItemCondition>,
}

/// A search to run, fixed for the duration of a crawl
///
/// Fields are private; the only way to get a `SearchQuery` is through
/// [`SearchQuery::new`] and the `with_*` methods, which validate their input.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    terms: String,
    category: Option<String>,
    filters: SearchFilters,
    sort: SortOrder,
    max_pages: u32,
}

impl SearchQuery {
    /// Creates a query for the given search terms
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if the terms are blank or
    /// `max_pages` is zero.
    ///
    /// # Example
    ///
    /// ```
    /// use listing_harvest::SearchQuery;
    ///
    /// let query = SearchQuery::new("  mechanical   keyboard ", 3).unwrap();
    /// assert_eq!(query.terms(), "mechanical keyboard");
    /// assert_eq!(query.max_pages(), 3);
    /// ```
    pub fn new(terms: &str, max_pages: u32) -> Result<Self, ConfigError> {
        let terms = terms.split_whitespace().collect::<Vec<_>>().join(" ");
        if terms.is_empty() {
            return Err(ConfigError::Validation(
                "search terms cannot be empty".to_string(),
            ));
        }
        if max_pages == 0 {
            return Err(ConfigError::Validation(
                "max_pages must be >= 1".to_string(),
            ));
        }

        Ok(Self {
            terms,
            category: None,
            filters: SearchFilters::default(),
            sort: SortOrder::default(),
            max_pages,
        })
    }

    /// Restricts the search to a category id
    pub fn with_category(mut self, category: Option<String>) -> Self {
        self.category = category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        self
    }

    /// Applies price and condition filters
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` for negative or non-finite prices,
    /// or a minimum above the maximum.
    pub fn with_filters(mut self, filters: SearchFilters) -> Result<Self, ConfigError> {
        for (name, price) in [("min_price", filters.min_price), ("max_price", filters.max_price)] {
            if let Some(p) = price {
                if !p.is_finite() || p < 0.0 {
                    return Err(ConfigError::Validation(format!(
                        "{} must be a non-negative number, got {}",
                        name, p
                    )));
                }
            }
        }
        if let (Some(min), Some(max)) = (filters.min_price, filters.max_price) {
            if min > max {
                return Err(ConfigError::Validation(format!(
                    "min_price ({}) is greater than max_price ({})",
                    min, max
                )));
            }
        }

        self.filters = filters;
        Ok(self)
    }

    /// Sets the result ordering
    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    pub fn terms(&self) -> &str {
        &self.terms
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn filters(&self) -> &SearchFilters {
        &self.filters
    }

    pub fn sort(&self) -> SortOrder {
        self.sort
    }

    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }

    /// Builds the URL of the first search results page
    ///
    /// # Arguments
    ///
    /// * `base_url` - Origin of the target site
    /// * `search_path` - Path of the search endpoint on that origin
    ///
    /// # Example
    ///
    /// ```
    /// use listing_harvest::SearchQuery;
    /// use url::Url;
    ///
    /// let base = Url::parse("https://www.ebay.com").unwrap();
    /// let url = SearchQuery::new("lego", 1)
    ///     .unwrap()
    ///     .first_page_url(&base, "/sch/i.html")
    ///     .unwrap();
    /// assert!(url.as_str().starts_with("https://www.ebay.com/sch/i.html?_nkw=lego"));
    /// ```
    pub fn first_page_url(&self, base_url: &Url, search_path: &str) -> Result<Url, url::ParseError> {
        let mut url = base_url.join(search_path)?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs.clear();
            pairs.append_pair("_nkw", &self.terms);
            pairs.append_pair("_sacat", self.category.as_deref().unwrap_or("0"));

            if let Some(min) = self.filters.min_price {
                pairs.append_pair("_udlo", &min.to_string());
            }
            if let Some(max) = self.filters.max_price {
                pairs.append_pair("_udhi", &max.to_string());
            }
            if let Some(condition) = self.filters.condition {
                pairs.append_pair("LH_ItemCondition", condition.code());
            }

            pairs.append_pair("_sop", self.sort.code());
            pairs.append_pair("_pgn", "1");
            pairs.append_pair("rt", "nc");
        }

        Ok(url)
    }
}

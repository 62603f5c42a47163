//! Parameter handling for the small-world index.
//!
//! Each surface exists twice: a typed struct with a validating constructor
//! and `with_*` builders, and a string-pair parser for callers that forward
//! externally supplied key/value parameters. Unknown keys and unparseable
//! values fail with [`SmallWorldError::BadParam`] before any work starts.

use std::{fmt, str::FromStr, thread};

use crate::error::{Result, SmallWorldError};

/// Default target out-degree per inserted node.
pub const DEFAULT_NN: usize = 10;

fn bad_param(reason: impl Into<String>) -> SmallWorldError {
    SmallWorldError::BadParam {
        reason: reason.into(),
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| bad_param(format!("cannot parse `{raw}` as a value for `{key}`")))
}

/// Build-time configuration.
///
/// `ef_construction` defaults to `nn` for compatibility with existing
/// indices, which yields a degenerate beam exactly as wide as the result
/// set; callers chasing recall should configure a noticeably larger value.
#[derive(Clone, Debug)]
pub struct IndexParams {
    nn: usize,
    ef_construction: usize,
    index_thread_qty: usize,
    use_proxy_dist: bool,
}

impl IndexParams {
    /// Creates a parameter set with explicit out-degree and beam width.
    ///
    /// # Errors
    /// Returns [`SmallWorldError::BadParam`] when `nn` is zero or when
    /// `ef_construction` is smaller than `nn`.
    ///
    /// # Examples
    /// ```
    /// use proxima_core::IndexParams;
    /// let params = IndexParams::new(10, 50).expect("parameters must be valid");
    /// assert_eq!(params.ef_construction(), 50);
    /// ```
    pub fn new(nn: usize, ef_construction: usize) -> Result<Self> {
        if nn == 0 {
            return Err(bad_param("NN must be greater than zero"));
        }
        if ef_construction < nn {
            return Err(bad_param(format!(
                "efConstruction ({ef_construction}) must be >= NN ({nn})"
            )));
        }
        Ok(Self {
            nn,
            ef_construction,
            index_thread_qty: default_thread_qty(),
            use_proxy_dist: false,
        })
    }

    /// Parses the build-time parameter surface from key/value pairs.
    ///
    /// Recognised keys are `NN`, `efConstruction`, `indexThreadQty`, and
    /// `useProxyDist`; anything else is rejected.
    ///
    /// # Examples
    /// ```
    /// use proxima_core::IndexParams;
    /// let params = IndexParams::from_pairs([("NN", "20"), ("efConstruction", "100")])
    ///     .expect("pairs must parse");
    /// assert_eq!(params.nn(), 20);
    /// ```
    pub fn from_pairs<'p>(pairs: impl IntoIterator<Item = (&'p str, &'p str)>) -> Result<Self> {
        let mut nn = None;
        let mut ef_construction = None;
        let mut index_thread_qty = None;
        let mut use_proxy_dist = None;
        for (key, value) in pairs {
            match key {
                "NN" => nn = Some(parse_value(key, value)?),
                "efConstruction" => ef_construction = Some(parse_value(key, value)?),
                "indexThreadQty" => index_thread_qty = Some(parse_value(key, value)?),
                "useProxyDist" => use_proxy_dist = Some(parse_value(key, value)?),
                other => return Err(bad_param(format!("unknown build parameter `{other}`"))),
            }
        }
        let nn = nn.unwrap_or(DEFAULT_NN);
        let mut params = Self::new(nn, ef_construction.unwrap_or(nn))?;
        if let Some(qty) = index_thread_qty {
            params = params.with_index_thread_qty(qty);
        }
        if let Some(proxy) = use_proxy_dist {
            params = params.with_use_proxy_dist(proxy);
        }
        Ok(params)
    }

    /// Overrides the number of insertion workers.
    #[must_use]
    pub fn with_index_thread_qty(mut self, qty: usize) -> Self {
        self.index_thread_qty = qty;
        self
    }

    /// Selects the space's proxy distance for all index-time comparisons.
    #[must_use]
    pub fn with_use_proxy_dist(mut self, use_proxy_dist: bool) -> Self {
        self.use_proxy_dist = use_proxy_dist;
        self
    }

    /// Returns the target out-degree per inserted node.
    #[must_use]
    pub fn nn(&self) -> usize {
        self.nn
    }

    /// Returns the indexing beam width.
    #[must_use]
    pub fn ef_construction(&self) -> usize {
        self.ef_construction
    }

    /// Returns the configured insertion worker count.
    #[must_use]
    pub fn index_thread_qty(&self) -> usize {
        self.index_thread_qty
    }

    /// Returns whether index-time comparisons use the proxy distance.
    #[must_use]
    pub fn use_proxy_dist(&self) -> bool {
        self.use_proxy_dist
    }
}

impl Default for IndexParams {
    fn default() -> Self {
        Self::new(DEFAULT_NN, DEFAULT_NN).expect("default parameters must be valid")
    }
}

fn default_thread_qty() -> usize {
    thread::available_parallelism().map_or(1, usize::from)
}

/// Which query-time beam to run.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SearchAlgo {
    /// Classic two-heap best-first beam.
    #[default]
    Old,
    /// Sorted-array beam with in-place re-exploration.
    V1Merge,
}

impl FromStr for SearchAlgo {
    type Err = SmallWorldError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "old" => Ok(Self::Old),
            "v1merge" => Ok(Self::V1Merge),
            other => Err(bad_param(format!(
                "algoType should be one of `old`, `v1merge`; got `{other}`"
            ))),
        }
    }
}

impl fmt::Display for SearchAlgo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Old => "old",
            Self::V1Merge => "v1merge",
        })
    }
}

/// Query-time configuration.
///
/// An unset beam width falls back to the index's `NN` at query time.
#[derive(Clone, Copy, Debug, Default)]
pub struct QueryParams {
    ef_search: Option<usize>,
    algo: SearchAlgo,
}

impl QueryParams {
    /// Creates the default query configuration (`algoType = old`,
    /// `efSearch` deferred to the index's `NN`).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the query-time parameter surface from key/value pairs.
    ///
    /// Recognised keys are `efSearch` and `algoType`.
    pub fn from_pairs<'p>(pairs: impl IntoIterator<Item = (&'p str, &'p str)>) -> Result<Self> {
        let mut params = Self::new();
        for (key, value) in pairs {
            match key {
                "efSearch" => params = params.with_ef_search(parse_value(key, value)?)?,
                "algoType" => params = params.with_algo(value.parse()?),
                other => return Err(bad_param(format!("unknown query parameter `{other}`"))),
            }
        }
        Ok(params)
    }

    /// Overrides the query beam width.
    ///
    /// # Errors
    /// Returns [`SmallWorldError::BadParam`] when `ef_search` is zero.
    pub fn with_ef_search(mut self, ef_search: usize) -> Result<Self> {
        if ef_search == 0 {
            return Err(bad_param("efSearch must be greater than zero"));
        }
        self.ef_search = Some(ef_search);
        Ok(self)
    }

    /// Selects the beam variant.
    #[must_use]
    pub fn with_algo(mut self, algo: SearchAlgo) -> Self {
        self.algo = algo;
        self
    }

    /// Returns the configured beam width, if any.
    #[must_use]
    pub fn ef_search(&self) -> Option<usize> {
        self.ef_search
    }

    /// Returns the selected beam variant.
    #[must_use]
    pub fn algo(&self) -> SearchAlgo {
        self.algo
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use crate::error::SmallWorldErrorCode;

    use super::*;

    #[test]
    fn defaults_match_the_documented_surface() {
        let params = IndexParams::default();
        assert_eq!(params.nn(), 10);
        assert_eq!(params.ef_construction(), 10);
        assert!(!params.use_proxy_dist());
        assert!(params.index_thread_qty() >= 1);
    }

    #[rstest]
    #[case(0, 10)]
    #[case(10, 5)]
    fn invalid_width_combinations_are_rejected(#[case] nn: usize, #[case] ef: usize) {
        let err = IndexParams::new(nn, ef).expect_err("construction must fail");
        assert_eq!(err.code(), SmallWorldErrorCode::BadParam);
    }

    #[test]
    fn pair_surface_fills_defaults_in_either_order() {
        let params = IndexParams::from_pairs([("efConstruction", "50"), ("NN", "20")])
            .expect("pairs must parse");
        assert_eq!(params.nn(), 20);
        assert_eq!(params.ef_construction(), 50);

        let params = IndexParams::from_pairs([("NN", "16")]).expect("pairs must parse");
        assert_eq!(params.ef_construction(), 16);
    }

    #[rstest]
    #[case("fanout", "3")]
    #[case("NN", "ten")]
    fn unknown_or_malformed_pairs_fail(#[case] key: &str, #[case] value: &str) {
        let err = IndexParams::from_pairs([(key, value)]).expect_err("parse must fail");
        assert_eq!(err.code(), SmallWorldErrorCode::BadParam);
    }

    #[rstest]
    #[case("old", SearchAlgo::Old)]
    #[case("V1Merge", SearchAlgo::V1Merge)]
    #[case(" OLD ", SearchAlgo::Old)]
    fn algo_names_parse_case_insensitively(#[case] raw: &str, #[case] expected: SearchAlgo) {
        assert_eq!(raw.parse::<SearchAlgo>().expect("must parse"), expected);
    }

    #[test]
    fn zero_ef_search_is_rejected() {
        let err = QueryParams::new()
            .with_ef_search(0)
            .expect_err("zero beam must fail");
        assert_eq!(err.code(), SmallWorldErrorCode::BadParam);

        let err = QueryParams::from_pairs([("efSearch", "0")]).expect_err("zero beam must fail");
        assert_eq!(err.code(), SmallWorldErrorCode::BadParam);
    }

    #[test]
    fn query_pair_surface_round_trips() {
        let params = QueryParams::from_pairs([("efSearch", "64"), ("algoType", "v1merge")])
            .expect("pairs must parse");
        assert_eq!(params.ef_search(), Some(64));
        assert_eq!(params.algo(), SearchAlgo::V1Merge);

        let err = QueryParams::from_pairs([("beam", "64")]).expect_err("unknown key must fail");
        assert_eq!(err.code(), SmallWorldErrorCode::BadParam);
    }
}

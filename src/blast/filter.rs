/// Result filter pipeline
///
/// Filters travel with the job and are applied in order once its reports
/// are parsed. Each filter narrows the list handed to the next one.
use crate::bio::newick::{parse_newick, Tree};
use crate::blast::metadata::HitMetadata;
use crate::blast::report::Hit;
use crate::TaedError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Read;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Filter {
    /// Keeps every hit
    PassThrough,
    /// Keeps hits whose `field` equals `value`. The field is read from the
    /// hit first, then from its metadata; hits with neither are kept.
    ValueMatch { field: String, value: String },
    /// Keeps hits whose tree (URL in metadata `field`) has a node labelled `value`
    TreeMembership { field: String, value: String },
    /// Named predicate from a [`FilterRegistry`]
    Custom {
        hook: String,
        #[serde(default)]
        value: String,
    },
}

/// Custom predicate: `(hit, argument) -> keep?`
pub type Hook = fn(&Hit, &str) -> Result<bool, TaedError>;

fn parse_threshold(hook: &str, value: &str) -> Result<f64, TaedError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| TaedError::Filter(format!("{} expects a number, got '{}'", hook, value)))
}

fn max_evalue(hit: &Hit, value: &str) -> Result<bool, TaedError> {
    let threshold = parse_threshold("max_evalue", value)?;
    Ok(hit.best_evalue().map_or(false, |e| e <= threshold))
}

fn min_bit_score(hit: &Hit, value: &str) -> Result<bool, TaedError> {
    let threshold = parse_threshold("min_bit_score", value)?;
    Ok(hit.best_bit_score().map_or(false, |s| s >= threshold))
}

/// Named predicates available to [`Filter::Custom`]
#[derive(Clone)]
pub struct FilterRegistry {
    hooks: HashMap<String, Hook>,
}

impl Default for FilterRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("max_evalue", max_evalue);
        registry.register("min_bit_score", min_bit_score);
        registry
    }
}

impl FilterRegistry {
    pub fn empty() -> Self {
        Self {
            hooks: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, hook: Hook) {
        self.hooks.insert(name.into(), hook);
    }

    pub fn get(&self, name: &str) -> Option<Hook> {
        self.hooks.get(name).copied()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.hooks.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Retrieves and parses a gene tree document
#[cfg_attr(test, mockall::automock)]
pub trait TreeFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Tree, TaedError>;
}

pub struct HttpTreeFetcher {
    client: reqwest::blocking::Client,
}

impl HttpTreeFetcher {
    pub fn new(timeout: Duration) -> Result<Self, TaedError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("taed/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TaedError::Remote(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl TreeFetcher for HttpTreeFetcher {
    fn fetch(&self, url: &str) -> Result<Tree, TaedError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| TaedError::Remote(format!("Failed to fetch tree {}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(TaedError::Remote(format!(
                "Tree server returned status {} for {}",
                response.status(),
                url
            )));
        }

        let mut body = String::new();
        response
            .take(16 * 1024 * 1024)
            .read_to_string(&mut body)?;

        parse_newick(&body)
    }
}

enum Step {
    PassThrough,
    ValueMatch { field: String, value: String },
    TreeMembership { field: String, value: String },
    Custom { name: String, hook: Hook, value: String },
}

/// Filters resolved against metadata, hooks and a tree source, ready to run
pub struct PreparedFilters<'a> {
    steps: Vec<Step>,
    metadata: &'a HitMetadata,
    fetcher: &'a dyn TreeFetcher,
    // None marks a tree that could not be fetched or parsed
    trees: HashMap<String, Option<Tree>>,
}

/// Resolve custom hooks and bind the metadata and tree source.
///
/// Unknown hook names are rejected here, before any hit is looked at.
pub fn prep_filters<'a>(
    filters: &[Filter],
    metadata: &'a HitMetadata,
    registry: &FilterRegistry,
    fetcher: &'a dyn TreeFetcher,
) -> Result<PreparedFilters<'a>, TaedError> {
    let steps = filters
        .iter()
        .map(|filter| match filter {
            Filter::PassThrough => Ok(Step::PassThrough),
            Filter::ValueMatch { field, value } => Ok(Step::ValueMatch {
                field: field.clone(),
                value: value.clone(),
            }),
            Filter::TreeMembership { field, value } => Ok(Step::TreeMembership {
                field: field.clone(),
                value: value.clone(),
            }),
            Filter::Custom { hook, value } => registry
                .get(hook)
                .map(|f| Step::Custom {
                    name: hook.clone(),
                    hook: f,
                    value: value.clone(),
                })
                .ok_or_else(|| {
                    TaedError::Filter(format!(
                        "Unknown filter hook '{}' (available: {})",
                        hook,
                        registry.names().join(", ")
                    ))
                }),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PreparedFilters {
        steps,
        metadata,
        fetcher,
        trees: HashMap::new(),
    })
}

impl<'a> PreparedFilters<'a> {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    fn metadata_field(&self, hit: &Hit, field: &str) -> Option<&'a str> {
        self.metadata
            .get(hit.key())
            .and_then(|fields| fields.get(field))
            .map(String::as_str)
    }

    fn tree(&mut self, url: &str) -> Option<&Tree> {
        let fetcher = self.fetcher;
        self.trees
            .entry(url.to_string())
            .or_insert_with(|| match fetcher.fetch(url) {
                Ok(tree) => Some(tree),
                Err(e) => {
                    tracing::warn!("Excluding hits for tree {}: {}", url, e);
                    None
                }
            })
            .as_ref()
    }

    fn keep(&mut self, step: usize, hit: &Hit) -> Result<bool, TaedError> {
        match &self.steps[step] {
            Step::PassThrough => Ok(true),
            Step::ValueMatch { field, value } => {
                let actual = hit
                    .field(field)
                    .or_else(|| self.metadata_field(hit, field).map(str::to_string));
                Ok(actual.map_or(true, |actual| actual == *value))
            }
            Step::TreeMembership { field, value } => {
                let Some(url) = self.metadata_field(hit, field) else {
                    return Ok(false);
                };
                let value = value.clone();
                Ok(self.tree(url).map_or(false, |tree| tree.contains_label(&value)))
            }
            Step::Custom { name, hook, value } => hook(hit, value)
                .map_err(|e| TaedError::Filter(format!("Hook '{}' failed: {}", name, e))),
        }
    }

    /// Apply every filter in order, each narrowing the previous output
    pub fn run_filters(&mut self, hits: Vec<Hit>) -> Result<Vec<Hit>, TaedError> {
        let mut current = hits;
        for step in 0..self.steps.len() {
            let mut kept = Vec::with_capacity(current.len());
            for hit in current {
                if self.keep(step, &hit)? {
                    kept.push(hit);
                }
            }
            current = kept;
        }
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blast::report::Hsp;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn hit(key: &str, evalue: f64) -> Hit {
        Hit {
            query_index: 0,
            query_id: "q".to_string(),
            query_def: "query".to_string(),
            query_len: 20,
            hit_num: 1,
            hit_id: format!("gi|{}|", key),
            hit_def: format!("{} protein", key),
            accession: key.to_string(),
            length: 100,
            hsps: vec![Hsp {
                num: 1,
                bit_score: 50.0 - evalue,
                score: 0.0,
                evalue,
                query_from: 1,
                query_to: 20,
                hit_from: 1,
                hit_to: 20,
                identity: 20,
                positive: 20,
                gaps: 0,
                align_len: 20,
                qseq: String::new(),
                hseq: String::new(),
                midline: String::new(),
            }],
        }
    }

    fn metadata(entries: &[(&str, &str, &str)]) -> HitMetadata {
        let mut metadata = HitMetadata::new();
        for (key, field, value) in entries {
            metadata
                .entry(key.to_string())
                .or_insert_with(BTreeMap::new)
                .insert(field.to_string(), value.to_string());
        }
        metadata
    }

    fn no_fetch() -> MockTreeFetcher {
        let mut fetcher = MockTreeFetcher::new();
        fetcher.expect_fetch().never();
        fetcher
    }

    fn keys(hits: &[Hit]) -> Vec<&str> {
        hits.iter().map(Hit::key).collect()
    }

    #[test]
    fn test_empty_filter_list_returns_hits_unchanged() {
        let meta = HitMetadata::new();
        let fetcher = no_fetch();
        let hits = vec![hit("A", 0.1), hit("B", 0.2)];

        let mut prepared = prep_filters(&[], &meta, &FilterRegistry::default(), &fetcher).unwrap();
        assert!(prepared.is_empty());
        assert_eq!(prepared.run_filters(hits.clone()).unwrap(), hits);
    }

    #[test]
    fn test_value_match_uses_hit_then_metadata() {
        let meta = metadata(&[("A", "species", "human"), ("B", "species", "mouse")]);
        let fetcher = no_fetch();
        let filters = vec![
            Filter::ValueMatch {
                field: "species".to_string(),
                value: "human".to_string(),
            },
            Filter::ValueMatch {
                field: "accession".to_string(),
                value: "A".to_string(),
            },
        ];

        let mut prepared = prep_filters(&filters, &meta, &FilterRegistry::default(), &fetcher).unwrap();
        let kept = prepared
            .run_filters(vec![hit("A", 0.1), hit("B", 0.1), hit("C", 0.1)])
            .unwrap();
        // C has no species anywhere, so the first filter keeps it; the second drops it
        assert_eq!(keys(&kept), vec!["A"]);
    }

    #[test]
    fn test_tree_membership() {
        let meta = metadata(&[
            ("A", "tree", "http://trees/1.nhx"),
            ("B", "tree", "http://trees/2.nhx"),
            ("D", "tree", "http://trees/1.nhx"),
        ]);

        let mut fetcher = MockTreeFetcher::new();
        fetcher
            .expect_fetch()
            .withf(|url| url == "http://trees/1.nhx")
            .times(1)
            .returning(|_| parse_newick("((gi_349004:0.1,gi_77:0.2):0.1,gi_5:0.3);"));
        fetcher
            .expect_fetch()
            .withf(|url| url == "http://trees/2.nhx")
            .times(1)
            .returning(|_| parse_newick("(gi_1,gi_2);"));

        let filters = vec![Filter::TreeMembership {
            field: "tree".to_string(),
            value: "gi 349004".to_string(),
        }];
        let mut prepared = prep_filters(&filters, &meta, &FilterRegistry::default(), &fetcher).unwrap();
        let kept = prepared
            .run_filters(vec![hit("A", 0.1), hit("B", 0.1), hit("C", 0.1), hit("D", 0.1)])
            .unwrap();

        // C has no tree URL; the tree for A and D is fetched once
        assert_eq!(keys(&kept), vec!["A", "D"]);
    }

    #[test]
    fn test_unfetchable_tree_excludes_hit() {
        let meta = metadata(&[("A", "tree", "http://trees/broken")]);
        let mut fetcher = MockTreeFetcher::new();
        fetcher
            .expect_fetch()
            .returning(|_| Err(TaedError::Remote("connection refused".to_string())));

        let filters = vec![Filter::TreeMembership {
            field: "tree".to_string(),
            value: "x".to_string(),
        }];
        let mut prepared = prep_filters(&filters, &meta, &FilterRegistry::default(), &fetcher).unwrap();
        assert!(prepared.run_filters(vec![hit("A", 0.1)]).unwrap().is_empty());
    }

    #[test]
    fn test_custom_hooks() {
        let meta = HitMetadata::new();
        let fetcher = no_fetch();
        let filters = vec![Filter::Custom {
            hook: "max_evalue".to_string(),
            value: "0.05".to_string(),
        }];

        let mut prepared = prep_filters(&filters, &meta, &FilterRegistry::default(), &fetcher).unwrap();
        let kept = prepared
            .run_filters(vec![hit("A", 0.01), hit("B", 0.5)])
            .unwrap();
        assert_eq!(keys(&kept), vec!["A"]);

        let bad = vec![Filter::Custom {
            hook: "min_bit_score".to_string(),
            value: "lots".to_string(),
        }];
        let mut prepared = prep_filters(&bad, &meta, &FilterRegistry::default(), &fetcher).unwrap();
        assert!(matches!(prepared.run_filters(vec![hit("A", 0.01)]), Err(TaedError::Filter(_))));
    }

    #[test]
    fn test_unknown_hook_is_rejected_at_prep() {
        let meta = HitMetadata::new();
        let fetcher = no_fetch();
        let filters = vec![Filter::Custom {
            hook: "nope".to_string(),
            value: String::new(),
        }];
        let result = prep_filters(&filters, &meta, &FilterRegistry::default(), &fetcher);
        assert!(matches!(result, Err(TaedError::Filter(_))));
    }

    #[test]
    fn test_filter_json_shape() {
        let filters: Vec<Filter> = serde_json::from_str(
            r#"[{"kind": "pass_through"},
                {"kind": "tree_membership", "field": "tree", "value": "gi 1"},
                {"kind": "custom", "hook": "max_evalue", "value": "1e-5"}]"#,
        )
        .unwrap();
        assert_eq!(filters[0], Filter::PassThrough);
        assert!(matches!(&filters[2], Filter::Custom { hook, .. } if hook == "max_evalue"));
    }

    fn arb_filter() -> impl Strategy<Value = Filter> {
        prop_oneof![
            Just(Filter::PassThrough),
            "[ABC]".prop_map(|v| Filter::ValueMatch {
                field: "accession".to_string(),
                value: v
            }),
            "[ABC]".prop_map(|v| Filter::ValueMatch {
                field: "species".to_string(),
                value: v
            }),
            (0u32..10).prop_map(|t| Filter::Custom {
                hook: "max_evalue".to_string(),
                value: (t as f64 / 10.0).to_string()
            }),
        ]
    }

    proptest! {
        #[test]
        fn filters_compose_by_sequential_narrowing(
            first in arb_filter(),
            second in arb_filter(),
            specs in proptest::collection::vec(("[ABC]", 0u32..10), 0..12),
        ) {
            let meta = metadata(&[("A", "species", "A"), ("B", "species", "C")]);
            let fetcher = no_fetch();
            let registry = FilterRegistry::default();
            let hits: Vec<Hit> = specs.iter().map(|(k, e)| hit(k, *e as f64 / 10.0)).collect();

            let both = prep_filters(&[first.clone(), second.clone()], &meta, &registry, &fetcher)
                .unwrap()
                .run_filters(hits.clone())
                .unwrap();
            let once = prep_filters(&[first], &meta, &registry, &fetcher)
                .unwrap()
                .run_filters(hits)
                .unwrap();
            let twice = prep_filters(&[second], &meta, &registry, &fetcher)
                .unwrap()
                .run_filters(once)
                .unwrap();

            prop_assert_eq!(both, twice);
        }
    }
}

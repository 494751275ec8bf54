/// Gene family search criteria and the SQL conditional built from them
///
/// The relational database is not touched here; callers receive the extra
/// join, the `WHERE` clause with `%s` placeholders, and the bound parameters
/// in placeholder order.
use crate::blast::job::SelectionFilter;
use crate::TaedError;
use serde::{Deserialize, Serialize};

pub const NO_SEARCH_DATA: &str =
    "No Search Data; Please Pass gi_number, kegg_pathway, species, or gene";
pub const NON_NUMERIC_TAXA: &str = "Invalid Taxa Data (Non Numeric)";

/// Search criteria as received; every field optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FamilySearchRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gi_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub species: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gene: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kegg_pathway: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_taxa: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_taxa: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dn_ds: Option<String>,
}

/// Validated search criteria
#[derive(Debug, Clone, PartialEq)]
pub struct FamilySearch {
    gi: String,
    species: String,
    gene: String,
    kegg_pathway: String,
    min_taxa: Option<String>,
    max_taxa: Option<String>,
    selection: Option<SelectionFilter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conditional {
    pub from_clause: String,
    pub where_clause: String,
    pub parameters: Vec<String>,
}

fn taxa_bound(value: &Option<String>) -> Result<Option<String>, TaedError> {
    match value {
        // An empty bound is accepted and passed through as-is
        Some(v) if v.is_empty() || v.chars().all(|c| c.is_ascii_digit()) => Ok(Some(v.clone())),
        Some(_) => Err(TaedError::Validation(NON_NUMERIC_TAXA.to_string())),
        None => Ok(None),
    }
}

impl FamilySearch {
    pub fn from_request(request: &FamilySearchRequest) -> Result<Self, TaedError> {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();

        let (gi, species, gene, kegg_pathway) = (
            text(&request.gi_number),
            text(&request.species),
            text(&request.gene),
            text(&request.kegg_pathway),
        );

        // Missing criteria is reported ahead of bad taxa bounds
        if gi.is_empty() && species.is_empty() && gene.is_empty() && kegg_pathway.is_empty() {
            return Err(TaedError::Validation(NO_SEARCH_DATA.to_string()));
        }

        Ok(Self {
            gi,
            species,
            gene,
            kegg_pathway,
            min_taxa: taxa_bound(&request.min_taxa)?,
            max_taxa: taxa_bound(&request.max_taxa)?,
            selection: request.dn_ds.as_deref().and_then(SelectionFilter::parse),
        })
    }

    /// Build the join, conditional and parameters for the family query.
    ///
    /// A gi number identifies a single family, so it overrides every other
    /// criterion.
    pub fn build_conditional(&self) -> Conditional {
        let mut from_clause = String::new();
        let mut cond = String::from(" WHERE (True)");
        let mut parameters = Vec::new();

        if !self.gi.is_empty() {
            cond.push_str(" AND (gi = %s)");
            parameters.push(self.gi.clone());
        } else {
            if !self.species.is_empty() {
                cond.push_str(" AND (species LIKE %s)");
                parameters.push(format!("%{}%", self.species));
            }
            if !self.gene.is_empty() {
                cond.push_str(" AND (geneName LIKE %s)");
                parameters.push(format!("%{}%", self.gene));
            }
            if !self.kegg_pathway.is_empty() {
                from_clause.push_str(" INNER JOIN keggMap ON keggMap.gi = gimap.gi");
                cond.push_str(" AND (keggMap.pathName = %s)");
                parameters.push(self.kegg_pathway.clone());
            }
            match (&self.min_taxa, &self.max_taxa) {
                (Some(min), Some(max)) => {
                    cond.push_str(" AND (directory BETWEEN %s AND %s)");
                    parameters.push(min.clone());
                    parameters.push(max.clone());
                }
                (Some(min), None) => {
                    cond.push_str(" AND (directory > %s)");
                    parameters.push(min.clone());
                }
                (None, Some(max)) => {
                    cond.push_str(" AND (directory < %s)");
                    parameters.push(max.clone());
                }
                (None, None) => {}
            }
            match self.selection {
                Some(SelectionFilter::PositiveOnly) => cond.push_str(" AND (positiveRatio = 1)"),
                Some(SelectionFilter::NegativeOnly) => cond.push_str(" AND (positiveRatio != 1)"),
                None => {}
            }
        }

        Conditional {
            from_clause,
            where_clause: cond,
            parameters,
        }
    }
}

/// Newick / NHX tree parsing
///
/// Gene trees served by TAED are rooted NHX files: plain Newick with
/// `[&&NHX:...]` annotations after node labels or branch lengths. Only the
/// topology, labels and branch lengths are kept; annotations are skipped.
use crate::TaedError;
use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, take_while1},
    character::complete::{char, multispace0},
    combinator::{map, opt, recognize},
    multi::{many0, separated_list1},
    number::complete::double,
    sequence::{delimited, pair, preceded, terminated},
    IResult,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    pub label: Option<String>,
    pub branch_length: Option<f64>,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    fn collect_labels<'a>(&'a self, out: &mut Vec<&'a str>) {
        if let Some(label) = &self.label {
            out.push(label);
        }
        for child in &self.children {
            child.collect_labels(out);
        }
    }

    fn count_leaves(&self) -> usize {
        if self.is_leaf() {
            1
        } else {
            self.children.iter().map(TreeNode::count_leaves).sum()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub root: TreeNode,
}

impl Tree {
    /// Every label in the tree, internal nodes included, in pre-order
    pub fn labels(&self) -> Vec<&str> {
        let mut labels = Vec::new();
        self.root.collect_labels(&mut labels);
        labels
    }

    /// Label lookup that treats `_`, `|` and blanks as the same separator,
    /// so `gi 123`, `gi_123` and `gi|123` all match
    pub fn contains_label(&self, label: &str) -> bool {
        let wanted = separators_as_blanks(label);
        self.labels().iter().any(|l| separators_as_blanks(l) == wanted)
    }

    pub fn leaf_count(&self) -> usize {
        self.root.count_leaves()
    }
}

fn separators_as_blanks(label: &str) -> String {
    label.trim().replace(['_', '|'], " ")
}

/// `[...]` comment, including NHX annotations
fn comment(input: &str) -> IResult<&str, &str> {
    recognize(delimited(char('['), opt(is_not("]")), char(']')))(input)
}

fn skip_comments(input: &str) -> IResult<&str, ()> {
    map(many0(preceded(multispace0, comment)), |_| ())(input)
}

fn quoted_label(input: &str) -> IResult<&str, String> {
    map(
        delimited(
            char('\''),
            many0(alt((
                map(tag("''"), |_| "'".to_string()),
                map(is_not("'"), |s: &str| s.to_string()),
            ))),
            char('\''),
        ),
        |parts: Vec<String>| parts.concat(),
    )(input)
}

fn unquoted_label(input: &str) -> IResult<&str, String> {
    map(
        take_while1(|c: char| !"()[]':;,".contains(c) && !c.is_whitespace()),
        // Underscores stand for blanks in unquoted Newick labels
        |s: &str| s.replace('_', " "),
    )(input)
}

fn label(input: &str) -> IResult<&str, String> {
    preceded(multispace0, alt((quoted_label, unquoted_label)))(input)
}

fn branch_length(input: &str) -> IResult<&str, f64> {
    preceded(pair(multispace0, char(':')), preceded(multispace0, double))(input)
}

fn children(input: &str) -> IResult<&str, Vec<TreeNode>> {
    delimited(
        preceded(multispace0, char('(')),
        separated_list1(preceded(multispace0, char(',')), subtree),
        preceded(multispace0, char(')')),
    )(input)
}

fn subtree(input: &str) -> IResult<&str, TreeNode> {
    let (input, children) = opt(children)(input)?;
    let (input, _) = skip_comments(input)?;
    let (input, label) = opt(label)(input)?;
    let (input, _) = skip_comments(input)?;
    let (input, branch_length) = opt(branch_length)(input)?;
    let (input, _) = skip_comments(input)?;

    Ok((
        input,
        TreeNode {
            label,
            branch_length,
            children: children.unwrap_or_default(),
        },
    ))
}

fn tree(input: &str) -> IResult<&str, Tree> {
    map(
        terminated(subtree, preceded(multispace0, char(';'))),
        |root| Tree { root },
    )(input)
}

/// Parse a single Newick tree document
pub fn parse_newick(input: &str) -> Result<Tree, TaedError> {
    let (rest, parsed) = tree(input.trim_start())
        .map_err(|e| TaedError::Parse(format!("Invalid Newick tree: {}", e)))?;

    if !rest.trim().is_empty() {
        return Err(TaedError::Parse(format!(
            "Unexpected trailing content after tree: '{}'",
            rest.trim().chars().take(40).collect::<String>()
        )));
    }

    Ok(parsed)
}

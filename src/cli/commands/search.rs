use crate::cli::output::*;
use crate::cli::OutputFormat;
use crate::search::{FamilySearch, FamilySearchRequest};
use clap::{Args, Subcommand};

#[derive(Args)]
pub struct SearchArgs {
    #[command(subcommand)]
    pub command: SearchCommands,
}

#[derive(Subcommand)]
pub enum SearchCommands {
    /// Print the SQL join, WHERE clause and parameters for a family search
    Conditional(ConditionalArgs),
}

#[derive(Args)]
pub struct ConditionalArgs {
    #[arg(long)]
    pub gi_number: Option<String>,

    #[arg(long)]
    pub species: Option<String>,

    #[arg(long)]
    pub gene: Option<String>,

    #[arg(long)]
    pub kegg_pathway: Option<String>,

    #[arg(long)]
    pub min_taxa: Option<String>,

    #[arg(long)]
    pub max_taxa: Option<String>,

    /// Positive selection restriction (Y/N)
    #[arg(long)]
    pub dn_ds: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: OutputFormat,
}

pub fn run(args: SearchArgs) -> anyhow::Result<()> {
    match args.command {
        SearchCommands::Conditional(args) => {
            let request = FamilySearchRequest {
                gi_number: args.gi_number,
                species: args.species,
                gene: args.gene,
                kegg_pathway: args.kegg_pathway,
                min_taxa: args.min_taxa,
                max_taxa: args.max_taxa,
                dn_ds: args.dn_ds,
            };
            let conditional = FamilySearch::from_request(&request)?.build_conditional();

            match args.format {
                OutputFormat::Json => print_json(&conditional)?,
                OutputFormat::Text => {
                    section_header("Family search");
                    tree_item(false, "FROM", Some(&format!("gimap{}", conditional.from_clause)));
                    tree_item(false, "WHERE", Some(conditional.where_clause.trim_start()));
                    tree_item(true, "Parameters", Some(&conditional.parameters.join(", ")));
                }
            }
            Ok(())
        }
    }
}

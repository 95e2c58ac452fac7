use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use regex::Regex;

mod error;
mod graph;
mod query;
mod report;

use graph::ScopeFilter;
use query::TypeMatcher;

#[derive(Parser)]
#[command(name = "workflow-inspect")]
#[command(about = "Diagnostic queries over image-generation workflow graphs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ScopeArg {
    /// Top-level nodes only.
    Top,
    /// Nodes inside subgraph definitions only.
    Subgraphs,
    /// Top level plus every subgraph.
    All,
}

impl From<ScopeArg> for ScopeFilter {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::Top => ScopeFilter::Top,
            ScopeArg::Subgraphs => ScopeFilter::Subgraphs,
            ScopeArg::All => ScopeFilter::All,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List every distinct node type, sorted.
    Types {
        file: String,

        #[arg(long, value_enum, default_value_t = ScopeArg::All)]
        scope: ScopeArg,
    },

    /// Show nodes of a given type.
    FindType {
        file: String,

        /// Exact type name, or a regex with --regex.
        type_name: String,

        #[arg(long)]
        regex: bool,

        #[arg(long, value_enum, default_value_t = ScopeArg::All)]
        scope: ScopeArg,
    },

    /// Show nodes carrying an input with the given name.
    FindInput {
        file: String,

        input_name: String,

        #[arg(long, value_enum, default_value_t = ScopeArg::All)]
        scope: ScopeArg,
    },

    /// Show output slots that carry a link id.
    Producers {
        file: String,

        link_id: String,

        #[arg(long, value_enum, default_value_t = ScopeArg::All)]
        scope: ScopeArg,
    },

    /// Show inputs that consume a node's outputs.
    Consumers {
        file: String,

        node_id: String,
    },

    /// Follow an input upstream to the nodes that produce it.
    Trace {
        file: String,

        node_id: String,

        input_name: String,

        /// Maximum number of hops to follow.
        #[arg(long, default_value_t = 1)]
        depth: usize,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.cmd {
        Commands::Types { file, scope } => {
            let workflow = graph::load_workflow(&file)?;
            for name in query::distinct_types(&workflow, scope.into()) {
                println!("{}", name);
            }
        }
        Commands::FindType {
            file,
            type_name,
            regex,
            scope,
        } => {
            let workflow = graph::load_workflow(&file)?;
            let matcher = if regex {
                let re = Regex::new(&type_name)
                    .with_context(|| format!("invalid type pattern {:?}", type_name))?;
                TypeMatcher::Pattern(re)
            } else {
                TypeMatcher::Exact(type_name)
            };
            for m in query::find_by_type(&workflow, scope.into(), &matcher) {
                println!("{}", report::type_line(&m));
            }
        }
        Commands::FindInput {
            file,
            input_name,
            scope,
        } => {
            let workflow = graph::load_workflow(&file)?;
            for m in query::find_by_input_name(&workflow, scope.into(), &input_name) {
                println!("{}", report::input_line(&m));
            }
        }
        Commands::Producers {
            file,
            link_id,
            scope,
        } => {
            let workflow = graph::load_workflow(&file)?;
            for m in query::producers_of_link(&workflow, scope.into(), &link_id) {
                println!("{}", report::producer_line(&m, &link_id));
            }
        }
        Commands::Consumers { file, node_id } => {
            let workflow = graph::load_workflow(&file)?;
            for m in query::consumers_of_node(&workflow, &node_id)? {
                println!("{}", report::consumer_line(&m, &node_id));
            }
        }
        Commands::Trace {
            file,
            node_id,
            input_name,
            depth,
        } => {
            let workflow = graph::load_workflow(&file)?;
            let hops = query::resolve_input_chain(&workflow, &node_id, &input_name, depth)?;
            for (index, hop) in hops.iter().enumerate() {
                println!("{}", report::chain_hop_block(index, hop));
            }
        }
    }

    Ok(())
}

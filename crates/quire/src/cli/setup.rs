use clap::{Parser, Subcommand, ValueEnum};
use quireapp::doc::export::ExportFormat;
use std::path::PathBuf;

/// Returns the version string, including git hash and commit date for non-release builds.
/// Format for releases: "v0.3.0"
/// Format for dev builds: "v0.3.0\ndev: abc1234 2026-01-15 14:30"
fn get_version() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");
    const GIT_COMMIT_DATE: &str = env!("GIT_COMMIT_DATE");
    const IS_RELEASE: &str = env!("IS_RELEASE");

    use std::sync::OnceLock;
    static VERSION_STRING: OnceLock<String> = OnceLock::new();

    VERSION_STRING.get_or_init(|| {
        if IS_RELEASE == "true" || GIT_HASH.is_empty() {
            format!("v{}", VERSION)
        } else {
            format!("v{}\ndev: {} {}", VERSION, GIT_HASH, GIT_COMMIT_DATE)
        }
    })
}

#[derive(Parser, Debug)]
#[command(
    name = "quire",
    bin_name = "quire",
    version = get_version(),
    disable_help_subcommand = true
)]
#[command(about = "Paginated research notes, kept in a tree of folders", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Data directory (tree, resources and settings)
    #[arg(long, global = true, env = "QUIRE_DATA_DIR", help_heading = "Options")]
    pub data_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true, help_heading = "Options")]
    pub verbose: bool,

    /// Print results as JSON
    #[arg(long, global = true, help_heading = "Options")]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the tree
    #[command(alias = "ls", display_order = 1)]
    Tree {
        /// Only show expanded folders (none are expanded by default)
        #[arg(long)]
        collapsed: bool,

        /// Show node ids
        #[arg(long)]
        ids: bool,
    },

    /// Add a folder, note or object
    #[command(alias = "new", display_order = 2)]
    Add {
        /// folder, note or object
        #[arg(long, short = 't', default_value = "note")]
        kind: String,

        /// Parent folder
        #[arg(long, short = 'i')]
        inside: Option<String>,

        /// Name words (joined with spaces)
        #[arg(required = true, trailing_var_arg = true)]
        name: Vec<String>,
    },

    /// Rename a node
    #[command(display_order = 3)]
    Rename {
        target: String,

        #[arg(required = true, trailing_var_arg = true)]
        name: Vec<String>,
    },

    /// Delete a node and everything inside it
    #[command(alias = "rm", display_order = 4)]
    Delete {
        target: String,

        /// Don't ask for confirmation
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Move a node into a folder, or to the top level without --to
    #[command(alias = "mv", display_order = 5)]
    Move {
        target: String,

        /// Destination folder
        #[arg(long)]
        to: Option<String>,

        /// Position among the new siblings (default: last)
        #[arg(long, short = 'p')]
        position: Option<u32>,
    },

    /// Change a node's position among its siblings
    #[command(display_order = 6)]
    Reorder { target: String, position: u32 },

    /// Read, write and edit notes
    #[command(display_order = 10)]
    Note {
        #[command(subcommand)]
        action: NoteCommands,
    },

    /// Export a note, or every note as a tar.gz archive
    #[command(display_order = 11)]
    Export {
        /// Note to export
        #[arg(required_unless_present = "archive", conflicts_with = "archive")]
        target: Option<String>,

        /// Output format (default: from the output file's extension, else text)
        #[arg(long, short = 'f', value_enum)]
        format: Option<FormatArg>,

        /// Output file, or directory for --archive (default: stdout / current dir)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Export every note
        #[arg(long)]
        archive: bool,
    },

    /// Manage bibliography references
    #[command(alias = "refs", display_order = 20)]
    Ref {
        #[command(subcommand)]
        action: Option<RefCommands>,
    },

    /// Manage resources (images, tables, formulas, media, code, text)
    #[command(display_order = 21)]
    Resource {
        #[command(subcommand)]
        action: Option<ResourceCommands>,
    },

    /// Show or change editor settings
    #[command(display_order = 30)]
    Config {
        #[command(subcommand)]
        action: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Debug)]
pub enum NoteCommands {
    /// Print a note
    Show {
        target: String,

        #[arg(long, short = 'f', value_enum, default_value = "text")]
        format: FormatArg,
    },

    /// Replace a note's content from a file or stdin (HTML or plain text)
    Write {
        target: String,

        /// Read from this file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Apply one editing command to a top-level block (0-based)
    Edit {
        target: String,
        block: usize,

        #[command(subcommand)]
        op: EditOp,
    },

    /// Lay a note out as pages
    Pages { target: String },
}

#[derive(Subcommand, Debug, Clone)]
pub enum EditOp {
    /// Increase the block's indent
    Indent,
    /// Decrease the block's indent
    Outdent,
    /// Turn the block into a heading
    Heading { level: u8 },
    /// Turn the block back into a paragraph
    Paragraph,
    /// Wrap the block in a blockquote
    Quote {
        #[arg(long)]
        cite: Option<String>,
    },
    /// Toggle bold over the block's text
    Bold,
    /// Toggle italic over the block's text
    Italic,
    /// Toggle underline over the block's text
    Underline,
    /// Toggle strikethrough over the block's text
    Strike,
    /// Toggle inline code over the block's text
    Code,
    /// Link the block's text
    Link { href: String },
    /// Attach an invisible data tag to the block's text
    Tag { value: String },
    /// Remove data tags from the block's text
    Untag,
    /// Append text at the end of the block
    Append {
        #[arg(required = true, trailing_var_arg = true)]
        text: Vec<String>,
    },
    /// Split the block at its end, starting a new one
    Split,
    /// Insert an equation after the block
    Equation { latex: String },
    /// Insert an image after the block
    Image {
        src: String,
        #[arg(long)]
        alt: Option<String>,
    },
    /// Insert a file attachment after the block
    Attach {
        src: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long = "type")]
        file_type: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum RefCommands {
    /// List references as a bibliography
    List,
    /// Add a reference
    Add {
        #[arg(long)]
        author: String,
        #[arg(long)]
        year: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        publication: String,
        #[arg(long)]
        doi: Option<String>,
        #[arg(long)]
        url: Option<String>,
    },
    /// Remove a reference
    Rm { target: String },
}

#[derive(Subcommand, Debug)]
pub enum ResourceCommands {
    /// List resources
    List {
        /// Only this kind (image, table, formula, ...)
        #[arg(long, short = 't')]
        kind: Option<String>,
    },
    /// Add a resource from its JSON payload, e.g. '{"type":"formula","latex":"e=mc^2"}'
    Add { title: String, payload: String },
    /// Change a resource's title
    Rename { target: String, title: String },
    /// Remove a resource
    Rm { target: String },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print one setting
    Get { key: String },
    /// Change one setting
    Set { key: String, value: String },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Html,
    Text,
    #[value(alias = "md")]
    Markdown,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Html => ExportFormat::Html,
            FormatArg::Text => ExportFormat::Text,
            FormatArg::Markdown => ExportFormat::Markdown,
        }
    }
}

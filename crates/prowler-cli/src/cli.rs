/// Out-of-process inspector for native executables with full debug
/// information: read and rewrite the global state of a live process by
/// manipulating its memory.
#[derive(clap::Parser)]
#[command(name = "prowler")]
pub struct CliOpts {
    /// The command to run.
    #[clap(subcommand)]
    pub action: CliAction,
}

/// The command to run.
#[derive(clap::Subcommand)]
pub enum CliAction {
    /// Read a variable, constant or function of the target process.
    Get {
        /// ID of the target process.
        pid: u64,

        /// Fully-qualified name (must contain a dot).
        name: String,
    },

    /// Write a process variable.
    ///
    /// Writing is unsafe: the target keeps running, and concurrent
    /// mutators may observe or destroy the update.
    Set {
        /// ID of the target process.
        pid: u64,

        /// Fully-qualified variable name (must contain a dot).
        name: String,

        /// New value; structs and maps take a JSON object, slices and
        /// arrays a bracketed list.
        value: String,
    },

    /// Display global variable or constant names of the target process.
    Ls {
        /// ID of the target process.
        pid: u64,

        /// What to list: 0 everything, 1 variables, 2 constants.
        #[clap(short = 't', long = "type", default_value_t = 0)]
        kind: u8,

        /// Prefix filtering (repeatable).
        #[clap(short, long = "prefixes")]
        prefixes: Vec<String>,

        /// Suffix filtering (repeatable).
        #[clap(short, long = "suffixes")]
        suffixes: Vec<String>,
    },

    /// Attach to a process, serve the transport and open a prompt.
    Attach {
        /// ID of the target process.
        pid: u64,
    },

    /// Connect a prompt to an already-running server.
    Conn {
        /// Address of the server, e.g. `127.0.0.1:4444`.
        addr: String,
    },
}

impl CliOpts {
    /// Parses the CLI from the command-line.
    ///
    /// # Warning
    ///
    /// Exits on error.
    pub fn parse_from_cmdline() -> Self {
        <Self as clap::Parser>::parse()
    }
}

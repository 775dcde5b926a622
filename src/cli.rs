use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true, disable_help_subcommand = true)]
pub struct Args {
    /// Base URL of the course API (overrides COURSEDESK_API_URL)
    #[arg(long, value_name = "URL", global = true)]
    pub api_url: Option<String>,

    /// Where the login session is kept (overrides COURSEDESK_SESSION_FILE)
    #[arg(long, value_name = "PATH", global = true)]
    pub session_file: Option<PathBuf>,

    /// Verbosity level (-v = debug, -vv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Welcome screen and session status
    Home,

    /// Print one page of courses
    List {
        /// Only courses whose name contains this text
        #[arg(short, long)]
        search: Option<String>,

        /// Only courses taught by this teacher (exact match)
        #[arg(short, long)]
        teacher: Option<String>,

        #[arg(short, long, default_value_t = 1)]
        page: u32,

        /// Re-sort the page by id on the client
        #[arg(long)]
        client_sort: bool,
    },

    /// Interactive list with live search, filter and paging
    Browse,

    /// Teachers available for filtering
    Teachers,

    /// Show one course
    Show {
        #[arg(value_name = "COURSE_ID")]
        id: String,
    },

    /// Add a course
    Add {
        #[arg(long)]
        name: String,

        #[arg(long)]
        credit: String,

        /// Chuyên ngành, Cơ sở or Đại cương
        #[arg(long, default_value = "Chuyên ngành")]
        category: String,

        #[arg(long)]
        teacher: String,
    },

    /// Edit a course; omitted fields keep their current value
    Edit {
        #[arg(value_name = "COURSE_ID")]
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        credit: Option<String>,

        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        teacher: Option<String>,
    },

    /// Delete a course after confirmation
    Delete {
        #[arg(value_name = "COURSE_ID")]
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Sign in and remember the session
    Login {
        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,
    },

    /// Create an account
    Register {
        #[arg(long)]
        username: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,

        #[arg(long)]
        confirm_password: String,
    },

    /// Forget the stored session
    Logout,

    /// Run the bundled course API
    Serve {
        /// Address to listen on (overrides COURSEDESK_BIND)
        #[arg(long)]
        bind: Option<String>,

        /// SQLite database URL (overrides DATABASE_URL)
        #[arg(long)]
        database_url: Option<String>,

        /// Require a bearer token for course changes
        #[arg(long)]
        require_auth: bool,
    },
}

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "weft",
    about = "Weft: a content-addressed social graph",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Replica snapshot file
    #[arg(long, global = true, default_value = "weft.json")]
    pub data: PathBuf,

    /// Identity secret key file
    #[arg(long, global = true, default_value = "weft.key")]
    pub key: PathBuf,

    /// Client configuration file
    #[arg(long, global = true, default_value = "weft.toml")]
    pub config: PathBuf,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a new identity key
    Keygen(KeygenArgs),
    /// Show the current identity
    Whoami,
    /// Publish a post
    Publish(PublishArgs),
    /// De-index one of your posts
    Delete(PostArg),
    /// Show one post
    Show(PostArg),
    /// Recent posts from the global timeline
    Timeline(TimelineArgs),
    /// Posts carrying a hashtag
    Tag(TagArgs),
    /// Posts by a user
    User(UserArgs),
    /// A post and its replies
    Thread(ThreadArgs),
    /// Like a post
    Like(PostArg),
    /// Withdraw a like
    Unlike(PostArg),
    /// Repost a post
    Repost(PostArg),
    /// Withdraw a repost
    Unrepost(PostArg),
    /// Show or update a profile
    Profile(ProfileArgs),
}

#[derive(Args)]
pub struct KeygenArgs {
    /// Overwrite an existing key file
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct PublishArgs {
    pub text: String,
    /// Id of the post this replies to
    #[arg(long)]
    pub reply_to: Option<String>,
    /// File to attach
    #[arg(long)]
    pub media: Option<PathBuf>,
}

#[derive(Args)]
pub struct PostArg {
    pub id: String,
}

#[derive(Args, Clone, Copy)]
pub struct WaitArg {
    /// How long to collect deliveries, in milliseconds
    #[arg(long, default_value = "500")]
    pub wait: u64,
}

#[derive(Args)]
pub struct TimelineArgs {
    /// Number of daily shards, newest first
    #[arg(long)]
    pub days: Option<usize>,
    #[command(flatten)]
    pub wait: WaitArg,
}

#[derive(Args)]
pub struct TagArgs {
    pub tag: String,
    #[command(flatten)]
    pub wait: WaitArg,
}

#[derive(Args)]
pub struct UserArgs {
    /// User public key; defaults to the current identity
    pub user: Option<String>,
    /// List reposts instead of authored posts
    #[arg(long)]
    pub reposts: bool,
    #[command(flatten)]
    pub wait: WaitArg,
}

#[derive(Args)]
pub struct ThreadArgs {
    pub id: String,
    #[command(flatten)]
    pub wait: WaitArg,
}

#[derive(Args)]
pub struct ProfileArgs {
    #[command(subcommand)]
    pub action: ProfileAction,
}

#[derive(Subcommand)]
pub enum ProfileAction {
    /// Show a profile
    Show { user: Option<String> },
    /// Update your own profile
    Set {
        name: String,
        #[arg(long)]
        bio: Option<String>,
        #[arg(long)]
        avatar: Option<String>,
    },
}

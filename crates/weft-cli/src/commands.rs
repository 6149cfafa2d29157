use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use bytes::Bytes;
use colored::Colorize;
use tokio::sync::mpsc;
use tracing::debug;
use weft_sdk::{
    ActionResult, DayBucket, InMemoryGraph, KeyIdentity, PostId, PostView, Profile, SdkResult,
    SigningKey, SubscriptionHandle, UserPub, Weft, WeftConfig,
};

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Keygen(ref args) => return cmd_keygen(&cli.key, args),
        Command::Whoami => return cmd_whoami(&cli.key),
        _ => {}
    }

    let session = Session::open(&cli)?;
    let format = cli.format;
    let outcome = match cli.command {
        Command::Keygen(_) | Command::Whoami => Ok(()),
        Command::Publish(args) => cmd_publish(&session, args, format).await,
        Command::Delete(args) => {
            let id = parse_post(&args.id)?;
            report(session.weft.delete_post(&id).await, "deleted", format)
        }
        Command::Show(args) => cmd_show(&session, &args.id, format).await,
        Command::Timeline(args) => cmd_timeline(&session, args, format).await,
        Command::Tag(args) => {
            let tag = args.tag;
            let posts = gather(args.wait, |tx| {
                session.weft.view_hashtag(&tag, move |v: PostView| {
                    let _ = tx.send(v);
                })
            })
            .await?;
            print_posts(posts, format)
        }
        Command::User(args) => cmd_user(&session, args, format).await,
        Command::Thread(args) => cmd_thread(&session, args, format).await,
        Command::Like(args) => {
            let id = parse_post(&args.id)?;
            report(session.weft.like_post(&id).await, "liked", format)
        }
        Command::Unlike(args) => {
            let id = parse_post(&args.id)?;
            report(session.weft.unlike_post(&id).await, "unliked", format)
        }
        Command::Repost(args) => {
            let id = parse_post(&args.id)?;
            report(session.weft.repost(&id).await, "reposted", format)
        }
        Command::Unrepost(args) => {
            let id = parse_post(&args.id)?;
            report(session.weft.unrepost(&id).await, "unreposted", format)
        }
        Command::Profile(args) => cmd_profile(&session, args.action, format).await,
    };
    // Reads may have repaired edges, so the replica is saved either way.
    session.save()?;
    outcome
}

/// One invocation's client over the snapshot file.
struct Session {
    weft: Weft,
    graph: Arc<InMemoryGraph>,
    data: std::path::PathBuf,
}

impl Session {
    fn open(cli: &Cli) -> anyhow::Result<Self> {
        let config = WeftConfig::load(&cli.config)
            .with_context(|| format!("reading {}", cli.config.display()))?;
        let graph = Arc::new(
            InMemoryGraph::load(&cli.data)
                .with_context(|| format!("loading {}", cli.data.display()))?,
        );
        let identity = match read_key(&cli.key)? {
            Some(key) => KeyIdentity::with_key(key),
            None => KeyIdentity::anonymous(),
        };
        let weft = Weft::new(graph.clone(), Arc::new(identity), config);
        debug!(data = %cli.data.display(), nodes = graph.len(), "replica loaded");
        Ok(Self {
            weft,
            graph,
            data: cli.data.clone(),
        })
    }

    fn save(&self) -> anyhow::Result<()> {
        self.graph
            .save(&self.data)
            .with_context(|| format!("saving {}", self.data.display()))
    }
}

fn read_key(path: &Path) -> anyhow::Result<Option<SigningKey>> {
    if !path.exists() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading key {}", path.display()))?;
    let key = SigningKey::from_hex(text.trim())
        .with_context(|| format!("invalid key in {}", path.display()))?;
    Ok(Some(key))
}

fn cmd_keygen(path: &Path, args: &KeygenArgs) -> anyhow::Result<()> {
    if path.exists() && !args.force {
        bail!("{} already exists (use --force to replace it)", path.display());
    }
    let key = SigningKey::generate();
    std::fs::write(path, key.to_hex())
        .with_context(|| format!("writing key {}", path.display()))?;
    println!("{} Generated identity", "✓".green().bold());
    println!("  Public key: {}", key.user_pub().to_hex().cyan());
    println!("  Key file: {}", path.display());
    Ok(())
}

fn cmd_whoami(path: &Path) -> anyhow::Result<()> {
    match read_key(path)? {
        Some(key) => println!("{}", key.user_pub().to_hex().cyan()),
        None => println!("{} (no key at {})", "anonymous".dimmed(), path.display()),
    }
    Ok(())
}

async fn cmd_publish(
    session: &Session,
    args: PublishArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let reply_to = args.reply_to.as_deref().map(parse_post).transpose()?;
    let media = match &args.media {
        Some(file) => {
            let blob = std::fs::read(file)
                .with_context(|| format!("reading media {}", file.display()))?;
            Some(session.weft.upload_media(Bytes::from(blob)).await?)
        }
        None => None,
    };
    let result = session
        .weft
        .publish_post(&args.text, media.as_deref(), reply_to.as_ref())
        .await;
    let verb = if result.duplicate { "already published" } else { "published" };
    report(result, verb, format)
}

async fn cmd_show(session: &Session, id: &str, format: OutputFormat) -> anyhow::Result<()> {
    let id = parse_post(id)?;
    let view = session.weft.view_post(&id).await?;
    print_posts(vec![view], format)
}

async fn cmd_timeline(
    session: &Session,
    args: TimelineArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let weft = &session.weft;
    let posts = gather(args.wait, |tx| {
        let deliver = move |v: PostView| {
            let _ = tx.send(v);
        };
        match args.days {
            Some(days) => weft.view_timeline_days(&DayBucket::today().window(days), deliver),
            None => weft.view_global_timeline(deliver),
        }
    })
    .await?;
    print_posts(posts, format)
}

async fn cmd_user(session: &Session, args: UserArgs, format: OutputFormat) -> anyhow::Result<()> {
    let user = match &args.user {
        Some(hex) => UserPub::from_hex(hex).with_context(|| format!("invalid user key {hex}"))?,
        None => current_user(session)?,
    };
    let weft = &session.weft;
    let posts = gather(args.wait, |tx| {
        let deliver = move |v: PostView| {
            let _ = tx.send(v);
        };
        if args.reposts {
            weft.get_user_reposts(&user, deliver)
        } else {
            weft.get_user_posts(&user, deliver)
        }
    })
    .await?;
    print_posts(posts, format)
}

async fn cmd_thread(
    session: &Session,
    args: ThreadArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let id = parse_post(&args.id)?;
    let root = session.weft.view_post(&id).await?;
    let replies = gather(args.wait, |tx| {
        session.weft.view_replies(&id, move |v: PostView| {
            let _ = tx.send(v);
        })
    })
    .await?;

    if format == OutputFormat::Json {
        let thread = serde_json::json!({ "post": root, "replies": sorted(replies) });
        println!("{}", serde_json::to_string_pretty(&thread)?);
        return Ok(());
    }
    if let Some(parent) = root.post.reply_to {
        println!("{} {}", "in reply to".dimmed(), parent.short_hex().yellow());
    }
    print_view(&root);
    for reply in sorted(replies) {
        println!("{}", "  │".dimmed());
        print_view(&reply);
    }
    Ok(())
}

async fn cmd_profile(
    session: &Session,
    action: ProfileAction,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match action {
        ProfileAction::Show { user } => {
            let user = match user {
                Some(hex) => UserPub::from_hex(&hex)
                    .with_context(|| format!("invalid user key {hex}"))?,
                None => current_user(session)?,
            };
            let profile = session.weft.get_user_profile(&user).await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&profile)?),
                OutputFormat::Text => match profile {
                    Some(p) => {
                        println!("{} {}", p.display_name.bold(), user.short_id().dimmed());
                        if !p.bio.is_empty() {
                            println!("  {}", p.bio);
                        }
                        if let Some(avatar) = &p.avatar_ref {
                            println!("  Avatar: {}", avatar.blue());
                        }
                    }
                    None => println!("No profile for {}", user.short_id().yellow()),
                },
            }
            Ok(())
        }
        ProfileAction::Set { name, bio, avatar } => {
            let user = current_user(session)?;
            let mut profile = Profile::new(user, name);
            if let Some(bio) = bio {
                profile = profile.with_bio(bio);
            }
            if let Some(avatar) = avatar {
                profile = profile.with_avatar(avatar);
            }
            report(session.weft.update_profile(profile).await, "profile updated", format)
        }
    }
}

fn current_user(session: &Session) -> anyhow::Result<UserPub> {
    session
        .weft
        .current_user()
        .context("no identity; run `weft keygen` first")
}

fn parse_post(hex: &str) -> anyhow::Result<PostId> {
    PostId::from_hex(hex).with_context(|| format!("invalid post id {hex}"))
}

/// Subscribe, collect deliveries for `wait`, then cancel.
async fn gather<T, S>(wait: WaitArg, subscribe: S) -> anyhow::Result<Vec<T>>
where
    T: Send + 'static,
    S: FnOnce(mpsc::UnboundedSender<T>) -> SdkResult<SubscriptionHandle>,
{
    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = subscribe(tx)?;
    tokio::time::sleep(Duration::from_millis(wait.wait)).await;
    handle.cancel();
    let mut out = Vec::new();
    while let Ok(item) = rx.try_recv() {
        out.push(item);
    }
    Ok(out)
}

fn report(result: ActionResult, verb: &str, format: OutputFormat) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if result.success {
        match &result.id {
            Some(id) => println!("{} {} {}", "✓".green().bold(), verb, id.yellow()),
            None => println!("{} {}", "✓".green().bold(), verb),
        }
    }
    match result.error {
        Some(error) => bail!("{}: {}", error.kind, error.message),
        None => Ok(()),
    }
}

fn sorted(mut posts: Vec<PostView>) -> Vec<PostView> {
    posts.sort_by(|a, b| b.post.timestamp.cmp(&a.post.timestamp));
    posts
}

fn print_posts(posts: Vec<PostView>, format: OutputFormat) -> anyhow::Result<()> {
    let posts = sorted(posts);
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&posts)?),
        OutputFormat::Text if posts.is_empty() => println!("No posts."),
        OutputFormat::Text => {
            for view in &posts {
                print_view(view);
            }
        }
    }
    Ok(())
}

fn print_view(view: &PostView) {
    let when = chrono::DateTime::from_timestamp_millis(view.post.timestamp)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();
    println!(
        "{} {} {}",
        view.post.id.short_hex().yellow(),
        view.author_name().cyan().bold(),
        when.dimmed()
    );
    println!("  {}", view.post.text);
    if let Some(media) = &view.post.media_ref {
        println!("  {} {}", "media".dimmed(), media.blue());
    }
    println!(
        "  {} {}  {} {}",
        "♥".red(),
        view.counts.likes,
        "↻".green(),
        view.counts.reposts
    );
}

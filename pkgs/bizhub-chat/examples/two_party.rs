use bizhub_chat::{ChatConfig, ChatEvent, ChatSession, PeerStatus, SessionUpdate, TimelineItem};
use bizhub_store::{Backend, StoreConfig, Transport};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, instrument, warn};
use tracing_subscriber::EnvFilter;

/// BizHub chat demo - a customer and a business owner talk through one backend
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// SQLite database file
    #[arg(long, default_value = "bizhub-demo.db")]
    db: PathBuf,

    /// Directory for uploaded attachments
    #[arg(long, default_value = "bizhub-objects")]
    objects: PathBuf,

    /// Business name
    #[arg(short, long, default_value = "Joe's Cafe")]
    business: String,

    /// Image to send as an attachment
    #[arg(short, long)]
    image: Option<PathBuf>,
}

/// Apply pending events for a little while and print what changed
#[instrument(skip_all, fields(user = session.current_user()))]
async fn drain(session: &mut ChatSession, events: &mut UnboundedReceiver<ChatEvent>) {
    while let Ok(Some(event)) = tokio::time::timeout(Duration::from_millis(200), events.recv()).await
    {
        match session.apply_event(event).await {
            SessionUpdate::Appended(m) => println!("[{}] new: {}", session.current_user(), m.content),
            SessionUpdate::StatusChanged { message_id, status } => {
                println!("[{}] {} is now {}", session.current_user(), message_id, status)
            }
            SessionUpdate::Peer(PeerStatus::Typing) => {
                println!("[{}] peer is typing...", session.current_user())
            }
            SessionUpdate::Notify { conversation_id, .. } => {
                println!("[{}] new message in {}", session.current_user(), conversation_id)
            }
            _ => {}
        }
    }
}

fn print_timeline(session: &ChatSession) {
    let title = session
        .active()
        .map(|c| c.display_name.clone())
        .unwrap_or_default();
    println!("\n=== {} as seen by {} ===", title, session.current_user());
    for item in session.timeline().items() {
        match item {
            TimelineItem::DateDivider(day) => println!("---------- {} ----------", day),
            TimelineItem::Message(m) => println!(
                "{} {:>8} [{}] {}",
                m.created_at.format("%H:%M:%S"),
                m.sender_id,
                m.status,
                m.content
            ),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let backend = Backend::open(StoreConfig {
        db_path: args.db.clone(),
        objects_dir: args.objects.clone(),
        ..Default::default()
    })
    .await?;

    backend.directory().upsert_user("owner", "Olivia").await?;
    backend.directory().upsert_user("customer", "Carl").await?;
    let business = match backend.search_businesses(&args.business, 1).await?.pop() {
        Some(existing) => existing,
        None => {
            backend
                .directory()
                .create_business(&args.business, "owner")
                .await?
        }
    };
    info!("Using business {} ({})", business.name, business.id);

    let transport: Arc<dyn Transport> = Arc::new(backend);
    let (mut owner, mut owner_events) =
        ChatSession::open(Arc::clone(&transport), "owner", ChatConfig::default());
    let (mut customer, mut customer_events) =
        ChatSession::open(Arc::clone(&transport), "customer", ChatConfig::default());

    customer.start_chat_with_business(&business.id).await?;
    let owner_view = owner
        .load_conversations()
        .await
        .iter()
        .find(|c| c.business_id.as_deref() == Some(business.id.as_str()))
        .cloned();
    let Some(owner_view) = owner_view else {
        anyhow::bail!("owner cannot see the conversation");
    };
    owner.select_conversation(owner_view).await;

    owner.send("hi").await?;
    drain(&mut customer, &mut customer_events).await;

    customer.on_input();
    drain(&mut owner, &mut owner_events).await;
    customer.send("hello").await?;

    if let Some(path) = &args.image {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("attachment");
        if let Err(e) = customer.send_attachment(name, &bytes).await {
            warn!("Attachment not sent: {}", e);
        }
    }

    drain(&mut owner, &mut owner_events).await;
    drain(&mut customer, &mut customer_events).await;

    print_timeline(&owner);
    print_timeline(&customer);

    customer.close();
    owner.close();
    Ok(())
}

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use filament_inventory::{
    auth::{FileSessionStore, Session, SessionStore},
    config::{self, ClientConfig},
    errors::ServiceError,
    insights::{InsightGenerator, InsightStreamState},
    lookup::{LookupState, LookupStatus},
    models::{
        BrandCreate, ColorCreate, InventoryStats, InventoryStatus, MaterialCreate, SpoolUpdate,
    },
    notifications::Notification,
    services::dashboard::{DEFAULT_ACTIVITY_LIMIT, DEFAULT_INSIGHTS_LIMIT, DEFAULT_JOBS_LIMIT},
    workflow::{SpoolForm, UnitDefaults},
    InventoryClient,
};
use serde::Serialize;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load_config().context("failed to load client config")?;
    config::init_tracing(config.log_level(), config.log_json);

    let session = open_session(&config)?;
    let client = InventoryClient::with_session(config, session.clone())
        .context("failed to build inventory client")?;

    let result = match cli.command {
        Commands::Session(command) => handle_session_command(session.as_ref(), command, cli.json),
        Commands::Spools(command) => handle_spools_command(&client, command, cli.json).await,
        Commands::Inventory(command) => handle_inventory_command(&client, command, cli.json).await,
        Commands::Brands(command) => handle_brands_command(&client, command, cli.json).await,
        Commands::Materials(command) => handle_materials_command(&client, command, cli.json).await,
        Commands::Colors(command) => handle_colors_command(&client, command, cli.json).await,
        Commands::Dashboard(command) => handle_dashboard_command(&client, command, cli.json).await,
        Commands::Scan => handle_scan(&client, cli.json).await,
    };

    if let Err(err) = &result {
        if let Some(service_err) = err.downcast_ref::<ServiceError>() {
            eprintln!("{}", Notification::for_error(service_err).message);
        }
    }
    result
}

#[derive(Parser)]
#[command(name = "spoolctl", about = "Filament spool inventory from the command line", version)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(subcommand)]
    Session(SessionCommands),
    #[command(subcommand)]
    Spools(SpoolsCommands),
    #[command(subcommand)]
    Inventory(InventoryCommands),
    #[command(subcommand)]
    Brands(LookupCommands),
    #[command(subcommand)]
    Materials(LookupCommands),
    #[command(subcommand)]
    Colors(ColorCommands),
    #[command(subcommand)]
    Dashboard(DashboardCommands),
    /// Read barcodes from stdin, one keystroke state per line, and show live matches
    Scan,
}

#[derive(Subcommand)]
enum SessionCommands {
    /// Store a bearer token issued by the backend
    SetToken {
        #[arg(long)]
        token: String,
        #[arg(long)]
        email: Option<String>,
    },
    Show,
    Clear,
}

#[derive(Subcommand)]
enum SpoolsCommands {
    List {
        #[arg(long, help = "Only spools with units in this status")]
        status: Option<InventoryStatus>,
    },
    Get {
        id: String,
    },
    /// Exact barcode match
    Lookup {
        barcode: String,
    },
    Create(CreateSpoolArgs),
    /// Edit an archetype; only the given fields change
    Update(UpdateSpoolArgs),
    Delete {
        id: String,
    },
}

#[derive(Args)]
struct CreateSpoolArgs {
    #[arg(long, help = "Barcode; generated by the backend when omitted")]
    barcode: Option<String>,
    #[arg(long)]
    material: String,
    #[arg(long)]
    brand: String,
    #[arg(long)]
    color: String,
    #[arg(long, help = "Color hex code like #FF0000")]
    hex: Option<String>,
    #[arg(long, default_value_t = 1000.0)]
    base_weight: f64,
    #[arg(long, default_value_t = 1.75)]
    thickness: f64,
    #[arg(long, action = ArgAction::SetTrue)]
    is_box: bool,
    #[arg(long, action = ArgAction::SetTrue)]
    spool_return: bool,
    #[arg(long)]
    trade_name: Option<String>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long, default_value_t = 1, help = "Units to add to inventory; 0 creates the archetype only")]
    quantity: u32,
    #[arg(long, help = "Starting weight of each unit in grams")]
    unit_weight: Option<f64>,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Args)]
struct UpdateSpoolArgs {
    id: String,
    #[arg(long)]
    barcode: Option<String>,
    #[arg(long)]
    material: Option<String>,
    #[arg(long)]
    brand: Option<String>,
    #[arg(long)]
    color: Option<String>,
    #[arg(long, help = "Color hex code like #FF0000")]
    hex: Option<String>,
    #[arg(long)]
    base_weight: Option<f64>,
    #[arg(long)]
    thickness: Option<f64>,
    #[arg(long)]
    is_box: Option<bool>,
    #[arg(long)]
    spool_return: Option<bool>,
    #[arg(long)]
    trade_name: Option<String>,
    #[arg(long)]
    category: Option<String>,
}

impl UpdateSpoolArgs {
    fn into_update(self) -> (String, SpoolUpdate) {
        let update = SpoolUpdate {
            barcode: self.barcode,
            base_weight: self.base_weight,
            is_box: self.is_box,
            thickness: self.thickness,
            spool_return: self.spool_return,
            color_name: self.color,
            color_hex_code: self.hex,
            brand_name: self.brand,
            material_name: self.material,
            trade_name: self.trade_name,
            category_name: self.category,
        };
        (self.id, update)
    }
}

#[derive(Subcommand)]
enum InventoryCommands {
    List {
        #[arg(long, default_value_t = 0)]
        skip: u32,
        #[arg(long)]
        limit: Option<u32>,
    },
    Get {
        id: String,
    },
    InUse,
    BySpool {
        spool_id: String,
    },
    Count {
        spool_id: String,
    },
    /// Add units of an existing spool
    Add {
        spool_id: String,
        #[arg(long, default_value_t = 1)]
        quantity: u32,
        #[arg(long)]
        weight: Option<f64>,
        #[arg(long)]
        notes: Option<String>,
    },
    Use {
        id: String,
        #[arg(long)]
        notes: Option<String>,
    },
    Stock {
        id: String,
    },
    Weigh {
        id: String,
        grams: f64,
    },
    Deplete {
        id: String,
    },
    Delete {
        id: String,
    },
}

#[derive(Subcommand)]
enum LookupCommands {
    List,
    Find { name: String },
    Add { name: String },
    Rename { id: String, name: String },
    Delete { id: String },
}

#[derive(Subcommand)]
enum ColorCommands {
    List,
    Find { name: String },
    Add {
        name: String,
        #[arg(long)]
        hex: String,
    },
    Update {
        id: String,
        name: String,
        #[arg(long)]
        hex: String,
    },
    Delete { id: String },
}

#[derive(Subcommand)]
enum DashboardCommands {
    Overview,
    Stats,
    Activity {
        #[arg(long, default_value_t = DEFAULT_ACTIVITY_LIMIT)]
        limit: u32,
    },
    Insights {
        #[arg(long, default_value_t = DEFAULT_INSIGHTS_LIMIT)]
        limit: u32,
    },
    Jobs {
        #[arg(long, default_value_t = DEFAULT_JOBS_LIMIT)]
        limit: u32,
    },
    /// Generate a new insight
    Generate {
        #[arg(long, action = ArgAction::SetTrue, help = "Print text as it streams in")]
        stream: bool,
    },
    DeleteInsight {
        id: String,
    },
}

fn open_session(config: &ClientConfig) -> Result<Arc<dyn SessionStore>> {
    let path = config
        .session_file
        .clone()
        .or_else(FileSessionStore::default_path)
        .ok_or_else(|| anyhow!("no session file configured and HOME is not set"))?;
    let store = FileSessionStore::open(&path)
        .with_context(|| format!("failed to open session {}", path.display()))?;
    Ok(Arc::new(store))
}

fn handle_session_command(
    session: &dyn SessionStore,
    command: SessionCommands,
    json: bool,
) -> Result<()> {
    match command {
        SessionCommands::SetToken { token, email } => {
            let mut new_session = Session::new(token);
            if let Some(email) = email {
                new_session = new_session.with_email(email);
            }
            session.save(new_session)?;
            println!("Session saved.");
        }
        SessionCommands::Show => match session.current() {
            Some(current) if json => print_json(&current)?,
            Some(current) => println!(
                "Token for {} saved at {}",
                current.email.as_deref().unwrap_or("(unknown user)"),
                current.saved_at
            ),
            None => println!("No session."),
        },
        SessionCommands::Clear => {
            session.clear()?;
            println!("Session cleared.");
        }
    }
    Ok(())
}

async fn handle_spools_command(
    client: &InventoryClient,
    command: SpoolsCommands,
    json: bool,
) -> Result<()> {
    let spools = &client.services().spools;
    match command {
        SpoolsCommands::List { status } => {
            let list = match status {
                Some(status) => spools.list_by_status(status).await?,
                None => spools.list().await?,
            };
            if json {
                print_json(&list)?;
            } else {
                for spool in &list {
                    println!(
                        "{}  {:<20} {} ({} g)",
                        spool.id,
                        spool.barcode,
                        spool.display_name(),
                        spool.base_weight
                    );
                }
            }
        }
        SpoolsCommands::Get { id } => {
            let spool = spools.get(&id).await?;
            if json {
                print_json(&spool)?;
            } else {
                println!("{} {} ({} g)", spool.barcode, spool.display_name(), spool.base_weight);
            }
        }
        SpoolsCommands::Lookup { barcode } => {
            let found = spools.search_by_barcode(&barcode).await?;
            if json {
                print_json(&found)?;
            } else if found.is_empty() {
                println!("No spool with barcode {}", barcode.trim());
            } else {
                for spool in &found {
                    println!("{}  {}", spool.id, spool.display_name());
                }
            }
        }
        SpoolsCommands::Create(args) => {
            let mut form = SpoolForm::with_barcode(args.barcode.unwrap_or_default());
            form.material_name = args.material;
            form.brand_name = args.brand;
            form.color_name = args.color;
            form.color_hex_code = args.hex;
            form.base_weight = args.base_weight;
            form.thickness = Some(args.thickness);
            form.is_box = args.is_box;
            form.spool_return = args.spool_return;
            form.trade_name = args.trade_name;
            form.category_name = args.category;
            form.quantity = args.quantity;
            form.unit_weight = args.unit_weight;
            form.notes = args.notes;

            let outcome = client.create_workflow().submit(&mut form).await?;
            let notification = Notification::for_created(&outcome);
            if json {
                print_json(&outcome.spool)?;
            }
            println!("{}", notification.message);
            for failure in &outcome.failures {
                debug!(position = failure.position, error = %failure.error, "Unit failed");
            }
        }
        SpoolsCommands::Update(args) => {
            let (id, update) = args.into_update();
            if update == SpoolUpdate::default() {
                return Err(anyhow!("nothing to update; pass at least one field flag"));
            }
            let spool = spools.update(&id, &update).await?;
            if json {
                print_json(&spool)?;
            } else {
                println!("Updated {} {} ({} g)", spool.barcode, spool.display_name(), spool.base_weight);
            }
        }
        SpoolsCommands::Delete { id } => {
            spools.delete(&id).await?;
            println!("Deleted spool {id}. Its inventory units were left in place.");
        }
    }
    Ok(())
}

async fn handle_inventory_command(
    client: &InventoryClient,
    command: InventoryCommands,
    json: bool,
) -> Result<()> {
    let inventory = &client.services().inventory;
    let units = match command {
        InventoryCommands::List { skip, limit } => {
            let limit = limit.unwrap_or(client.config().inventory_page_size);
            inventory.list(skip, limit).await?
        }
        InventoryCommands::Get { id } => vec![inventory.get(&id).await?],
        InventoryCommands::InUse => inventory.in_use().await?,
        InventoryCommands::BySpool { spool_id } => inventory.by_spool(&spool_id).await?,
        InventoryCommands::Count { spool_id } => {
            let count = inventory.count_by_spool(&spool_id).await?;
            if json {
                print_json(&count)?;
            } else {
                println!("{} unit(s) of spool {}", count.count, count.spool_id);
            }
            return Ok(());
        }
        InventoryCommands::Add {
            spool_id,
            quantity,
            weight,
            notes,
        } => {
            let spool = client.services().spools.get(&spool_id).await?;
            let defaults = UnitDefaults {
                weight,
                notes,
                ..UnitDefaults::default()
            };
            let outcome = client
                .add_units_workflow()
                .run(&spool, quantity, &defaults)
                .await?;
            println!("{}", Notification::for_added(&outcome).message);
            outcome.created
        }
        InventoryCommands::Use { id, notes } => vec![inventory.mark_in_use(&id, notes).await?],
        InventoryCommands::Stock { id } => vec![inventory.mark_in_stock(&id).await?],
        InventoryCommands::Weigh { id, grams } => vec![inventory.update_weight(&id, grams).await?],
        InventoryCommands::Deplete { id } => vec![inventory.mark_depleted(&id).await?],
        InventoryCommands::Delete { id } => {
            inventory.delete(&id).await?;
            println!("Deleted inventory unit {id}.");
            return Ok(());
        }
    };

    if json {
        print_json(&units)?;
    } else {
        for unit in &units {
            println!(
                "{}  {:<20} {:<10} {:>7.1} g  {}",
                unit.id,
                unit.spool.barcode,
                unit.status(),
                unit.weight,
                unit.spool.display_name()
            );
        }
    }
    Ok(())
}

async fn handle_brands_command(
    client: &InventoryClient,
    command: LookupCommands,
    json: bool,
) -> Result<()> {
    let brands = &client.services().brands;
    let rows = match command {
        LookupCommands::List => brands.list().await?,
        LookupCommands::Find { name } => brands.search_by_name(&name).await?,
        LookupCommands::Add { name } => vec![brands.create(BrandCreate { name }).await?],
        LookupCommands::Rename { id, name } => vec![brands.update(&id, BrandCreate { name }).await?],
        LookupCommands::Delete { id } => {
            brands.delete(&id).await?;
            println!("Deleted brand {id}.");
            return Ok(());
        }
    };
    print_named(&rows, json, |b| (&b.id, &b.name))
}

async fn handle_materials_command(
    client: &InventoryClient,
    command: LookupCommands,
    json: bool,
) -> Result<()> {
    let materials = &client.services().materials;
    let rows = match command {
        LookupCommands::List => materials.list().await?,
        LookupCommands::Find { name } => materials.search_by_name(&name).await?,
        LookupCommands::Add { name } => vec![materials.create(MaterialCreate { name }).await?],
        LookupCommands::Rename { id, name } => {
            vec![materials.update(&id, MaterialCreate { name }).await?]
        }
        LookupCommands::Delete { id } => {
            materials.delete(&id).await?;
            println!("Deleted material {id}.");
            return Ok(());
        }
    };
    print_named(&rows, json, |m| (&m.id, &m.name))
}

async fn handle_colors_command(
    client: &InventoryClient,
    command: ColorCommands,
    json: bool,
) -> Result<()> {
    let colors = &client.services().colors;
    let rows = match command {
        ColorCommands::List => colors.list().await?,
        ColorCommands::Find { name } => colors.search_by_name(&name).await?,
        ColorCommands::Add { name, hex } => {
            vec![colors.create(ColorCreate { name, hex_code: hex }).await?]
        }
        ColorCommands::Update { id, name, hex } => {
            vec![colors.update(&id, ColorCreate { name, hex_code: hex }).await?]
        }
        ColorCommands::Delete { id } => {
            colors.delete(&id).await?;
            println!("Deleted color {id}.");
            return Ok(());
        }
    };
    if json {
        print_json(&rows)?;
    } else {
        for color in &rows {
            println!("{}  {:<20} {}", color.id, color.name, color.hex_code);
        }
    }
    Ok(())
}

async fn handle_dashboard_command(
    client: &InventoryClient,
    command: DashboardCommands,
    json: bool,
) -> Result<()> {
    let dashboard = &client.services().dashboard;
    match command {
        DashboardCommands::Overview => {
            let overview = dashboard.overview().await?;
            if json {
                print_json(&overview)?;
            } else {
                print_stats(&overview.stats);
                if let Some(insight) = &overview.latest_insight {
                    println!("\nLatest insight ({}):\n{}", insight.created_at, insight.content);
                }
            }
        }
        DashboardCommands::Stats => {
            let stats = dashboard.stats().await?;
            if json {
                print_json(&stats)?;
            } else {
                print_stats(&stats);
            }
        }
        DashboardCommands::Activity { limit } => {
            let activity = dashboard.activity(limit).await?;
            if json {
                print_json(&activity)?;
            } else {
                for entry in &activity {
                    println!("{}  {:<10} {}", entry.created_at, entry.action_type, entry.description);
                }
            }
        }
        DashboardCommands::Insights { limit } => {
            let insights = dashboard.insights_history(limit).await?;
            if json {
                print_json(&insights)?;
            } else {
                for insight in &insights {
                    println!("[{}] {}\n{}\n", insight.id, insight.created_at, insight.content);
                }
            }
        }
        DashboardCommands::Jobs { limit } => {
            let jobs = dashboard.jobs(limit).await?;
            if json {
                print_json(&jobs)?;
            } else {
                for job in &jobs {
                    println!(
                        "{}  {:<20} {:<10} retries {}/{}",
                        job.id, job.job_type, job.status, job.retry_count, job.max_retries
                    );
                }
            }
        }
        DashboardCommands::Generate { stream: false } => {
            let response = dashboard.generate_insight().await?;
            if json {
                print_json(&response)?;
            } else {
                println!("{}\n\n{}", response.message, response.insight.content);
            }
        }
        DashboardCommands::Generate { stream: true } => {
            let (abort, registration) = InsightGenerator::cancel_pair();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    abort.abort();
                }
            });
            let mut printed = 0usize;
            let state = client
                .insight_generator()
                .generate(registration, |state| {
                    if let InsightStreamState::Streaming(text) = state {
                        print!("{}", &text[printed..]);
                        let _ = std::io::stdout().flush();
                        printed = text.len();
                    }
                })
                .await?;
            println!();
            match state {
                InsightStreamState::Complete(insight) => println!("Saved insight {}", insight.id),
                InsightStreamState::Failed(msg) => return Err(anyhow!(msg)),
                InsightStreamState::Cancelled => println!("Cancelled."),
                _ => {}
            }
        }
        DashboardCommands::DeleteInsight { id } => {
            dashboard.delete_insight(&id).await?;
            println!("Deleted insight {id}.");
        }
    }
    Ok(())
}

/// Treats each stdin line as the current content of the barcode field and
/// prints the lookup state whenever it changes.
async fn handle_scan(client: &InventoryClient, json: bool) -> Result<()> {
    let lookup = client.spawn_lookup();
    let mut updates = lookup.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last_printed: Option<LookupState> = None;

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => lookup.input(line),
                None => break,
            },
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow_and_update().clone();
                print_lookup(&state, json)?;
                last_printed = Some(state);
            }
        }
    }

    // Shutdown settles the last input and waits for its search.
    let limit = client.config().debounce() + client.config().request_timeout();
    if tokio::time::timeout(limit, lookup.shutdown()).await.is_err() {
        warn!(?limit, "Lookup did not finish before the deadline");
    }
    let state = updates.borrow().clone();
    if state != LookupState::default() && last_printed.as_ref() != Some(&state) {
        print_lookup(&state, json)?;
    }
    Ok(())
}

fn print_lookup(state: &LookupState, json: bool) -> Result<()> {
    if json {
        let spools = match &state.status {
            LookupStatus::Found(spools) => spools.clone(),
            _ => Vec::new(),
        };
        return print_json(&serde_json::json!({
            "barcode": state.debounced_value,
            "status": lookup_label(&state.status),
            "spools": spools,
        }));
    }
    let barcode = state.debounced_value.as_deref().unwrap_or("");
    match &state.status {
        LookupStatus::Found(spools) if state.is_unique_match() => {
            println!("{barcode}: {} (already in catalog)", spools[0].display_name())
        }
        LookupStatus::Found(spools) => println!("{barcode}: {} matches", spools.len()),
        LookupStatus::Failed(msg) => println!("{barcode}: lookup failed: {msg}"),
        other => println!("{barcode}: {}", lookup_label(other)),
    }
    Ok(())
}

fn lookup_label(status: &LookupStatus) -> &'static str {
    match status {
        LookupStatus::Idle => "idle",
        LookupStatus::Searching => "searching",
        LookupStatus::Found(_) => "found",
        LookupStatus::NotFound => "not found",
        LookupStatus::Failed(_) => "failed",
    }
}

fn print_stats(stats: &InventoryStats) {
    println!("Spools:       {}", stats.total_spools);
    println!("In use:       {}", stats.spools_in_use);
    println!("Low stock:    {}", stats.low_stock_count);
    println!("Total weight: {:.1} kg", stats.total_weight / 1000.0);
}

fn print_named<T: Serialize>(
    rows: &[T],
    json: bool,
    fields: impl Fn(&T) -> (&String, &String),
) -> Result<()> {
    if json {
        return print_json(&rows);
    }
    for row in rows {
        let (id, name) = fields(row);
        println!("{id}  {name}");
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

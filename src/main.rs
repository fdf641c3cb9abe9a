//! GramScale command line front end.
//!
//! Drives the same commands the mobile shell calls, against a local data
//! directory.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use gramscale_lib::{
    commands,
    db::{FoodItemInput, RecipeInput, ServingInput},
    default_data_dir,
    error::{AppError, CommandError},
    init_logging,
    scanner::ScanOutcome,
    summary::TotalsPolicy,
    AppState, DATA_DIR_ENV,
};

#[derive(Parser, Debug)]
#[command(name = "gramscale", about = "Barcode-driven nutrition log")]
struct Cli {
    /// Directory holding the database and settings
    #[arg(long, global = true, env = DATA_DIR_ENV)]
    data_dir: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve a barcode from the local cache or Open Food Facts
    Scan { barcode: String },

    /// Show the cached food item for a barcode
    Show { barcode: String },

    /// Log a food item by barcode, or by id with --id
    Log {
        /// Barcode of the item
        #[arg(required_unless_present = "id", conflicts_with = "id")]
        barcode: Option<String>,

        /// Food item id, for quick-add items without a barcode
        #[arg(long)]
        id: Option<i64>,

        #[command(flatten)]
        serving: ServingArgs,
    },

    /// Entries and totals for a day (default: today, UTC)
    Summary {
        #[arg(long)]
        day: Option<NaiveDate>,

        /// Sum raw per-serving values for this run instead of scaling by servings
        #[arg(long)]
        unweighted: bool,
    },

    /// Delete a log entry
    Delete { entry_id: i64 },

    /// Create a food item by hand
    QuickAdd(FoodArgs),

    /// Overwrite a food item's editable fields
    Edit {
        id: i64,

        #[command(flatten)]
        food: FoodArgs,
    },

    #[command(subcommand)]
    Recipe(RecipeCommands),

    /// Show settings, or change the scan debounce window
    Settings {
        #[arg(long)]
        debounce_ms: Option<u64>,
    },
}

#[derive(Subcommand, Debug)]
enum RecipeCommands {
    /// Save a recipe
    Add {
        name: String,
        #[arg(long)]
        amount_g: f64,
        #[arg(long, default_value_t = 0.0)]
        calories: f64,
        #[arg(long, default_value_t = 0.0)]
        protein: f64,
        #[arg(long, default_value_t = 0.0)]
        carbs: f64,
        #[arg(long, default_value_t = 0.0)]
        fat: f64,
    },
    /// List saved recipes
    List,
}

#[derive(Args, Debug)]
struct ServingArgs {
    /// Number of servings
    #[arg(long, conflicts_with = "amount")]
    servings: Option<f64>,

    /// Quantity in the item's serving unit
    #[arg(long)]
    amount: Option<f64>,
}

impl ServingArgs {
    fn to_input(&self) -> Option<ServingInput> {
        match (self.servings, self.amount) {
            (_, Some(amount)) => Some(ServingInput::Amount(amount)),
            (Some(servings), None) => Some(ServingInput::Servings(servings)),
            (None, None) => None,
        }
    }
}

#[derive(Args, Debug)]
struct FoodArgs {
    name: String,
    #[arg(long)]
    brand: Option<String>,
    #[arg(long, default_value_t = 0.0)]
    calories: f64,
    #[arg(long, default_value_t = 0.0)]
    protein: f64,
    #[arg(long, default_value_t = 0.0)]
    carbs: f64,
    #[arg(long, default_value_t = 0.0)]
    fat: f64,
    #[arg(long)]
    fiber: Option<f64>,
    #[arg(long)]
    sodium: Option<f64>,
    #[arg(long)]
    serving_quantity: Option<f64>,
    #[arg(long)]
    serving_unit: Option<String>,
}

impl From<FoodArgs> for FoodItemInput {
    fn from(args: FoodArgs) -> Self {
        FoodItemInput {
            name: args.name,
            brand: args.brand,
            calories: args.calories,
            protein_g: args.protein,
            carbs_g: args.carbs,
            fat_g: args.fat,
            fiber_g: args.fiber,
            sodium_g: args.sodium,
            serving_quantity: args.serving_quantity,
            serving_unit: args.serving_unit,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let data_dir = cli
        .data_dir
        .or_else(default_data_dir)
        .context("no data directory; pass --data-dir")?;
    let state = AppState::open(&data_dir)?;
    let json = cli.json;

    match cli.command {
        Commands::Scan { barcode } => {
            commands::scanner_focused(&state)?;
            let outcome = commands::scan_barcode(&state, barcode).await?;
            match &outcome {
                ScanOutcome::Resolved { resolution } if !json => {
                    println!(
                        "{} [{:?}] {} kcal, food item {}",
                        resolution.food.name,
                        resolution.source,
                        resolution.food.calories,
                        resolution.food.id
                    );
                }
                ScanOutcome::Ignored { reason } if !json => println!("Ignored: {reason:?}"),
                _ => print_json(&outcome)?,
            }
        }
        Commands::Show { barcode } => {
            let food = commands::get_food_item(&state, barcode).await?;
            if json {
                print_json(&food)?;
            } else {
                println!("#{} {}", food.id, food.name);
                if let Some(brand) = &food.brand {
                    println!("  brand    {brand}");
                }
                println!("  calories {}", food.calories);
                println!("  protein  {} g", food.protein_g);
                println!("  carbs    {} g", food.carbs_g);
                println!("  fat      {} g", food.fat_g);
            }
        }
        Commands::Log {
            barcode,
            id,
            serving,
        } => {
            let entry = match (barcode, id) {
                (_, Some(id)) => commands::log_food_item(&state, id, serving.to_input()).await,
                (Some(barcode), None) => {
                    commands::log_food(&state, barcode, serving.to_input()).await
                }
                (None, None) => Err(CommandError::from(AppError::InvalidInput(
                    "a barcode or --id is required".into(),
                ))),
            }?;
            if json {
                print_json(&entry)?;
            } else {
                println!(
                    "Logged entry {} ({} serving(s))",
                    entry.id, entry.serving_multiplier
                );
            }
        }
        Commands::Summary { day, unweighted } => {
            if unweighted {
                state.summary.set_policy(TotalsPolicy::Unweighted).await;
            }
            let summary = commands::get_daily_summary(&state, day).await?;
            if json {
                print_json(&summary)?;
            } else {
                println!("{} ({:?})", summary.day, summary.policy);
                for row in &summary.entries {
                    println!(
                        "  [{}] {} x{} {}",
                        row.entry_id,
                        row.logged_at.format("%H:%M"),
                        row.serving_multiplier,
                        row.food.name
                    );
                }
                let totals = summary.totals;
                println!(
                    "Totals: {:.0} kcal, {:.1} g protein, {:.1} g carbs, {:.1} g fat",
                    totals.calories, totals.protein_g, totals.carbs_g, totals.fat_g
                );
            }
        }
        Commands::Delete { entry_id } => {
            commands::delete_log_entry(&state, entry_id).await?;
            println!("Deleted entry {entry_id}");
        }
        Commands::QuickAdd(food) => {
            let food = commands::quick_add_food(&state, food.into()).await?;
            if json {
                print_json(&food)?;
            } else {
                println!("Created food item {} ({})", food.id, food.name);
            }
        }
        Commands::Edit { id, food } => {
            let food = commands::update_food_item(&state, id, food.into()).await?;
            if json {
                print_json(&food)?;
            } else {
                println!("Updated food item {} ({})", food.id, food.name);
            }
        }
        Commands::Recipe(RecipeCommands::Add {
            name,
            amount_g,
            calories,
            protein,
            carbs,
            fat,
        }) => {
            let recipe = commands::create_recipe(
                &state,
                RecipeInput {
                    name,
                    amount_g,
                    calories,
                    protein_g: protein,
                    carbs_g: carbs,
                    fat_g: fat,
                },
            )
            .await?;
            if json {
                print_json(&recipe)?;
            } else {
                println!("Saved recipe {} ({})", recipe.id, recipe.name);
            }
        }
        Commands::Recipe(RecipeCommands::List) => {
            let recipes = commands::list_recipes(&state).await?;
            if json {
                print_json(&recipes)?;
            } else {
                for recipe in recipes {
                    println!(
                        "#{} {} ({} g, {} kcal)",
                        recipe.id, recipe.name, recipe.amount_g, recipe.calories
                    );
                }
            }
        }
        Commands::Settings { debounce_ms } => {
            if let Some(debounce_ms) = debounce_ms {
                commands::set_scan_debounce(&state, debounce_ms)?;
            }
            print_json(&commands::get_settings(&state)?)?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

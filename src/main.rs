// carform: fill, export and print vehicle inspection records

use carform::export::{default_export_dir, default_export_filename, with_csv_extension};
use carform::print::default_print_filename;
use carform::render::load_template;
use carform::{
    export_csv, print_form, to_tabular_rows, AppError, DateTarget, FormEvent, FormField,
    FormState, GroupKind, PreferenceRecord, PreferenceStore, PrintJob, TemplateLayout, Typeface,
};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::debug;
use std::path::{Path, PathBuf};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(author, version, about = "Fill, export and print vehicle inspection records")]
struct Args {
    /// Form file to read and update
    #[arg(short, long, global = true, default_value = "carform.json")]
    form: PathBuf,

    /// Directory holding the saved preferences (defaults to the user config dir)
    #[arg(long, global = true, env = "CARFORM_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start a new, empty form
    New {
        /// Replace an existing form file
        #[arg(long)]
        force: bool,
    },

    /// Set one of the main fields, e.g. "Registration number"
    Set { field: FormField, value: String },

    /// Add, remove or fill entries of a repeatable group
    Group {
        #[arg(value_enum)]
        group: GroupKind,

        #[command(subcommand)]
        action: GroupAction,
    },

    /// Split an 8-digit YYYYMMDD year field into year, month and day
    Autofill {
        #[arg(value_enum)]
        target: DateTarget,
    },

    /// Fill year, month and day from a date (YYYY-MM-DD, defaults to today)
    Date {
        #[arg(value_enum)]
        target: DateTarget,
        date: Option<String>,
    },

    /// Clear every field and hide all extra group entries
    Reset,

    /// Show the form as it would be exported
    Show,

    /// Export the form and preferences to CSV
    Export {
        /// Output file (defaults to CarForm_<date>_<time>.csv on the desktop)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Draw the form onto the A4 template and write a print-ready PDF
    Print {
        /// Output PDF (defaults to CarForm_<date>_<time>.pdf)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also save the rendered page as PNG
        #[arg(long)]
        png: Option<PathBuf>,

        /// Template scan to draw on (file path or URL)
        #[arg(long)]
        template: Option<String>,

        /// TrueType/OpenType font (defaults to a system CJK font)
        #[arg(long, env = "CARFORM_FONT")]
        font: Option<PathBuf>,

        /// Anchor table as JSON (see `carform layout`)
        #[arg(long)]
        layout: Option<PathBuf>,
    },

    /// Show or change the saved business details
    Prefs {
        #[command(subcommand)]
        action: PrefsAction,
    },

    /// Write the anchor table as JSON
    Layout {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum GroupAction {
    /// Show the entry after SLOT
    Reveal {
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        slot: u32,
    },
    /// Hide and clear SLOT (the first entry cannot be hidden)
    Hide {
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        slot: u32,
    },
    /// Set the text of a visible SLOT
    Set {
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        slot: u32,
        value: String,
    },
}

#[derive(Subcommand, Debug)]
enum PrefsAction {
    /// Show the saved values
    Show,
    /// Save new values; options left out keep their saved value
    Set {
        #[arg(long)]
        business_name: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        telephone: Option<String>,
        #[arg(long)]
        cellphone: Option<String>,
    },
    /// Forget all saved values
    Reset,
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() {
    env_logger::init_from_env(Env::default().default_filter_or("warn"));

    if let Err(e) = run() {
        if e.is_warning() {
            eprintln!("Warning: {}", e);
        } else {
            eprintln!("Error: {}", e);
        }
        std::process::exit(1);
    }
}

fn run() -> Result<(), AppError> {
    let args = Args::parse();
    debug!("{:?}", args);

    match args.command {
        Command::New { force } => {
            if args.form.exists() && !force {
                return Err(AppError::Validation(format!(
                    "{} already exists (use --force to replace it)",
                    args.form.display()
                )));
            }
            FormState::new().save(&args.form)?;
            println!("✓ Created: {}", args.form.display());
        }
        Command::Set { field, value } => {
            update_form(&args.form, FormEvent::ValueChanged { field, value })?;
        }
        Command::Group { group, action } => {
            let event = match action {
                GroupAction::Reveal { slot } => FormEvent::Reveal { group, index: slot_index(slot) },
                GroupAction::Hide { slot } => FormEvent::Hide { group, index: slot_index(slot) },
                GroupAction::Set { slot, value } => FormEvent::GroupValueChanged {
                    group,
                    index: slot_index(slot),
                    value,
                },
            };
            let form = update_form(&args.form, event)?;
            print_group(&form, group);
        }
        Command::Autofill { target } => {
            let form = update_form(&args.form, FormEvent::AutoFill(target))?;
            print_date(&form, target);
        }
        Command::Date { target, date } => {
            let date = parse_date(&date)?;
            let form = update_form(&args.form, FormEvent::PickDate { target, date })?;
            print_date(&form, target);
        }
        Command::Reset => {
            update_form(&args.form, FormEvent::Reset)?;
            println!("✓ Cleared: {}", args.form.display());
        }
        Command::Show => {
            let form = FormState::load(&args.form)?;
            let prefs = open_store(&args.config_dir)?.load()?;
            print_rows(&form, &prefs);
        }
        Command::Export { output } => {
            let form = FormState::load(&args.form)?;
            let prefs = open_store(&args.config_dir)?.load()?;
            let path = match output {
                Some(p) => with_csv_extension(p),
                None => default_export_dir().join(default_export_filename(&Local::now().naive_local())),
            };
            export_csv(&form, &prefs, &path)?;
            println!("✓ Exported: {}", path.display());
        }
        Command::Print {
            output,
            png,
            template,
            font,
            layout,
        } => {
            let form = FormState::load(&args.form)?;
            let prefs = open_store(&args.config_dir)?.load()?;
            let layout = match layout {
                Some(p) => TemplateLayout::load(&p)?,
                None => TemplateLayout::default(),
            };
            let template = template.as_deref().map(load_template).transpose()?;
            let typeface = Typeface::discover(font.as_deref())?;

            let output = output
                .unwrap_or_else(|| PathBuf::from(default_print_filename(&Local::now().naive_local())));
            let job = PrintJob {
                form: &form,
                prefs: &prefs,
                layout: &layout,
                typeface: &typeface,
                template: template.as_ref(),
            };
            print_form(&job, &output, png.as_deref())?;

            println!("✓ Generated: {}", output.display());
            if let Some(png) = png {
                println!("  Preview: {}", png.display());
            }
        }
        Command::Prefs { action } => run_prefs(&open_store(&args.config_dir)?, action)?,
        Command::Layout { output } => {
            let json = TemplateLayout::default().to_json()?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    println!("✓ Written: {}", path.display());
                }
                None => println!("{}", json),
            }
        }
    }

    Ok(())
}

fn run_prefs(store: &PreferenceStore, action: PrefsAction) -> Result<(), AppError> {
    match action {
        PrefsAction::Show => {
            let prefs = store.load()?;
            for (field, value) in prefs.entries() {
                println!("{}: {}", field.label(), value);
            }
            println!("  Stored in: {}", store.path().display());
        }
        PrefsAction::Set {
            business_name,
            address,
            telephone,
            cellphone,
        } => {
            if business_name.is_none() && address.is_none() && telephone.is_none() && cellphone.is_none() {
                return Err(AppError::Validation("Nothing to change".to_string()));
            }
            let current = store.load()?;
            let prefs = PreferenceRecord {
                business_name: business_name.unwrap_or(current.business_name),
                address: address.unwrap_or(current.address),
                phone_number: telephone.unwrap_or(current.phone_number),
                cellphone_number: cellphone.unwrap_or(current.cellphone_number),
            };
            store.save(&prefs)?;
            println!("✓ Your preferences have been saved successfully.");
        }
        PrefsAction::Reset => {
            store.restore_defaults()?;
            println!("✓ All settings have been restored to defaults.");
        }
    }
    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Load the form, apply one event and save it back.
fn update_form(path: &Path, event: FormEvent) -> Result<FormState, AppError> {
    let mut form = FormState::load(path)?;
    form.apply(event)?;
    form.save(path)?;
    Ok(form)
}

/// Slot numbers on the command line start at 1.
fn slot_index(slot: u32) -> usize {
    (slot as usize).saturating_sub(1)
}

fn open_store(config_dir: &Option<PathBuf>) -> Result<PreferenceStore, AppError> {
    match config_dir {
        Some(dir) => Ok(PreferenceStore::in_dir(dir)),
        None => PreferenceStore::open_default(),
    }
}

fn parse_date(date_str: &Option<String>) -> Result<NaiveDate, AppError> {
    match date_str {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|_| AppError::Validation(format!("Invalid date: {} (use YYYY-MM-DD)", s))),
        None => Ok(Local::now().date_naive()),
    }
}

fn print_rows(form: &FormState, prefs: &PreferenceRecord) {
    let rows = to_tabular_rows(form, prefs);
    let width = rows.iter().map(|r| r.label.chars().count()).max().unwrap_or(0);
    for row in rows {
        println!("{:<width$}  {}", row.label, row.value, width = width);
    }
}

fn print_group(form: &FormState, kind: GroupKind) {
    let group = form.group(kind);
    println!("{} ({}/{}):", kind.title(), group.visible_count(), group.capacity());
    for (index, value) in group.visible_slots() {
        println!("  {}. {}", index + 1, value);
    }
}

fn print_date(form: &FormState, target: DateTarget) {
    let (year, month, day) = target.fields();
    println!(
        "✓ {} {} / {} {} / {} {}",
        year,
        form.field(year),
        month,
        form.field(month),
        day,
        form.field(day)
    );
}

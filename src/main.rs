extern crate log;
extern crate pretty_env_logger;

use std::path::PathBuf;
use std::process::exit;

use clap::{arg, command, value_parser, Command};
use log::debug;

use omr_grader::answer_key::{AnswerKey, KeyStore};
use omr_grader::composite::annotated_image_path;
use omr_grader::interpret::{interpret_sheet, load_sheet_image, InterpretOptions};
use omr_grader::layout::Layout;
use omr_grader::report::SheetSummary;
use omr_grader::sheet::SheetDefinition;

fn main() {
    pretty_env_logger::init_custom_env("LOG");

    let matches = cli().get_matches();
    let image_path = match matches.get_one::<PathBuf>("image") {
        Some(path) => path.clone(),
        None => {
            eprintln!("Error: image path is required");
            exit(1);
        }
    };

    let mut definition = match matches.get_one::<PathBuf>("sheet") {
        Some(path) => match SheetDefinition::load(path) {
            Ok(definition) => definition,
            Err(e) => {
                eprintln!("Error loading sheet definition: {}", e);
                exit(1);
            }
        },
        None => SheetDefinition::default(),
    };
    definition.layout = layout_overrides(&matches, definition.layout);

    let options = InterpretOptions::from(&definition);

    let store = KeyStore::new();
    if let Some(key_path) = matches.get_one::<PathBuf>("key") {
        match AnswerKey::load(key_path, options.layout.options_per_question) {
            Ok(key) => {
                store.replace(key);
            }
            Err(e) => {
                eprintln!("Error loading answer key: {}", e);
                exit(1);
            }
        }
    }

    let image = match load_sheet_image(&image_path) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("Error: {}", e);
            exit(1);
        }
    };

    let key = store.current();
    let sheet = match interpret_sheet(&image, &options, key.as_deref()) {
        Ok(sheet) => sheet,
        Err(e) => {
            eprintln!("Error: {}", e);
            exit(1);
        }
    };

    let output_path = matches
        .get_one::<PathBuf>("output")
        .cloned()
        .unwrap_or_else(|| annotated_image_path(&image_path));
    if let Err(e) = sheet.composite.save(&output_path) {
        eprintln!("Error writing {}: {}", output_path.display(), e);
        exit(1);
    }
    debug!("wrote annotated image to {}", output_path.display());

    if matches.get_flag("json") {
        match serde_json::to_string_pretty(&sheet) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing results: {}", e);
                exit(1);
            }
        }
    } else {
        let summary = SheetSummary::new(&options.layout, &sheet.questions)
            .with_title(&definition.title)
            .with_evaluation(sheet.evaluation.as_ref());
        print!("{}", summary);
        println!("Annotated image: {}", output_path.display());
    }

    let incomplete = sheet.incomplete_questions(options.layout.options_per_question);
    if matches.get_flag("strict") && !incomplete.is_empty() {
        eprintln!(
            "Error: questions {:?} do not show {} bubbles each",
            incomplete, options.layout.options_per_question
        );
        exit(2);
    }
}

fn layout_overrides(matches: &clap::ArgMatches, layout: Layout) -> Layout {
    let mut layout = layout;
    if let Some(&sections) = matches.get_one::<u32>("sections") {
        layout.sections = sections;
    }
    if let Some(&rows) = matches.get_one::<u32>("rows") {
        layout.rows_per_section = rows;
    }
    if let Some(&options) = matches.get_one::<u32>("options") {
        layout.options_per_question = options;
    }
    match matches.get_one::<u32>("questions") {
        Some(&questions) => layout.number_of_questions = questions,
        None if matches.contains_id("sections") || matches.contains_id("rows") => {
            layout.number_of_questions = layout.sections.saturating_mul(layout.rows_per_section);
        }
        None => {}
    }
    layout
}

#[allow(clippy::cognitive_complexity)]
fn cli() -> Command {
    command!()
        .arg(
            arg!(-s --sheet <PATH> "Path to a sheet definition JSON file")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            arg!(-k --key <PATH> "Path to an answer key JSON array")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(arg!(--sections <N> "Number of question sections").value_parser(value_parser!(u32)))
        .arg(arg!(--rows <N> "Questions per section").value_parser(value_parser!(u32)))
        .arg(arg!(--options <N> "Options per question").value_parser(value_parser!(u32)))
        .arg(arg!(--questions <N> "Total number of questions").value_parser(value_parser!(u32)))
        .arg(
            arg!(-o --output <PATH> "Where to write the annotated image")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(arg!(--json "Print results as JSON"))
        .arg(arg!(--strict "Fail when a question does not show every printed bubble"))
        .arg(
            arg!(image: <IMAGE> "Path to the photographed answer sheet")
                .value_parser(value_parser!(PathBuf))
                .required(true),
        )
}

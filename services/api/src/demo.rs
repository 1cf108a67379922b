use chrono::{Duration, Utc};
use clap::Args;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use uap_admission::admissions::merit::write_csv;
use uap_admission::admissions::{
    AdmissionService, ApplicantDetails, ApplicationSubmission, AttachedFiles, FileSlot,
    FileStager, LifecycleScheduler, ManualClock, MeritWeights, PaymentEvent, ThreadRandom,
};
use uap_admission::config::SchedulerConfig;
use uap_admission::error::AppError;
use uap_admission::storage::{FileKeyValueStore, MemoryKeyValueStore};
use uap_admission::tuition::TuitionQuote;

/// Scheduler ticks allowed for the demo payment before giving up.
const MAX_DEMO_TICKS: usize = 200;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Stop after submission and the document sweep.
    #[arg(long)]
    pub(crate) skip_payment: bool,
    /// Print the merit list as CSV instead of a table.
    #[arg(long)]
    pub(crate) csv: bool,
}

#[derive(Args, Debug)]
pub(crate) struct MeritArgs {
    /// Directory holding the persisted collections
    #[arg(long)]
    pub(crate) data_dir: PathBuf,
    /// Write the CSV here instead of stdout
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
    /// GPA weight in percent (defaults to 60)
    #[arg(long)]
    pub(crate) gpa_weight: Option<f64>,
    /// Exam weight in percent (defaults to 40)
    #[arg(long)]
    pub(crate) exam_weight: Option<f64>,
}

#[derive(Args, Debug)]
pub(crate) struct TuitionArgs {
    /// Credits in the degree program
    #[arg(long)]
    pub(crate) credits: f64,
    /// Fee per credit in BDT
    #[arg(long)]
    pub(crate) per_credit_fee: f64,
    /// Scholarship percentage (0-100)
    #[arg(long, default_value_t = 0.0)]
    pub(crate) scholarship: f64,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { skip_payment, csv } = args;

    let start = Utc::now();
    let clock = Arc::new(ManualClock::new(start));
    let service = AdmissionService::with_sources(
        Arc::new(MemoryKeyValueStore::default()),
        clock.clone(),
        Arc::new(ThreadRandom),
    );

    println!("UAP admission portal demo");
    let mut stager = FileStager::new();
    stager.stage_bytes(FileSlot::Photo, "photo.png", "image/png", b"\x89PNG demo")?;
    stager.stage_bytes(
        FileSlot::Transcript,
        "transcript.pdf",
        "application/pdf",
        b"%PDF-1.7 demo transcript",
    )?;

    let cohort = [
        (
            demo_applicant("Nadia Islam", "HSC 2024, GPA: 5.00", "91"),
            "CSE",
            "bachelors",
            stager.into_files(),
        ),
        (
            demo_applicant("Arif Hossain", "HSC 2023, GPA: 4.40", "77"),
            "EEE",
            "masters",
            AttachedFiles::default(),
        ),
        (
            demo_applicant("Tania Akter", "A-levels, results pending", ""),
            "Architecture",
            "postgraduate",
            AttachedFiles::default(),
        ),
    ];

    let mut ids = Vec::new();
    for (applicant, department, program, files) in cohort {
        let record = service.submit(ApplicationSubmission {
            applicant,
            department: department.to_string(),
            program: program.to_string(),
            files,
        })?;
        println!(
            "- Submitted {} for {} ({} / {}) -> fee {} BDT",
            record.id(),
            record.applicant.name,
            record.department,
            record.program,
            record.fee()
        );
        ids.push(record.id().clone());
    }

    let swept = service.sweep()?;
    println!("- Document sweep advanced {swept} application(s)");

    if !skip_payment {
        let payer = &ids[0];
        service.begin_payment(payer)?;
        println!("\nMock payment for {payer}");

        let mut scheduler = LifecycleScheduler::new(&SchedulerConfig::default(), start);
        let mut settled = false;
        for _ in 0..MAX_DEMO_TICKS {
            let now = clock.advance(Duration::milliseconds(450));
            let report = scheduler.tick(&service, now)?;
            for event in report.payments {
                match event {
                    PaymentEvent::Progressed { progress, .. } => {
                        println!("  payment progress {progress}%");
                    }
                    PaymentEvent::Completed { receipt, .. } => {
                        println!("  payment complete\n{receipt}");
                        settled = true;
                    }
                    PaymentEvent::Abandoned { status, .. } => {
                        println!("  payment abandoned (status {status:?})");
                        settled = true;
                    }
                }
            }
            if settled {
                break;
            }
        }

        // one more sweep so the paid applicant with documents is verified
        clock.advance(Duration::milliseconds(2500));
        service.sweep()?;

        if let Some(acceptance) = service.accept(payer)? {
            println!(
                "- Accepted {} -> {} seats left in {}",
                payer, acceptance.seats_left, acceptance.record.department
            );
        }
    }

    println!("\nSeat ledger");
    for seats in service.seats()? {
        println!("  - {}: {}", seats.department, seats.remaining);
    }

    if let Some(record) = service.get(&ids[0])? {
        match serde_json::to_string_pretty(&record.status_view()) {
            Ok(json) => println!("\nPublic status payload:\n{json}"),
            Err(err) => println!("\nPublic status payload unavailable: {err}"),
        }
    }

    let rows = service.merit(None)?;
    println!("\nMerit list (60% GPA / 40% exam)");
    if csv {
        write_csv(&rows, io::stdout().lock())?;
    } else {
        for row in &rows {
            println!(
                "  {}. {} [{}] GPA {} ({:?}) | exam {} ({:?}) | score {}",
                row.rank,
                row.name,
                row.department,
                row.gpa,
                row.gpa_source,
                row.exam,
                row.exam_source,
                row.score
            );
        }
    }

    let quote = TuitionQuote::calculate(140.0, 5500.0, 25.0)?;
    println!(
        "\nTuition sample: 140 credits x 5500 BDT, 25% scholarship -> {} total, {} per semester",
        quote.after_scholarship, quote.per_semester
    );

    Ok(())
}

pub(crate) fn run_merit_export(args: MeritArgs) -> Result<(), AppError> {
    let MeritArgs {
        data_dir,
        output,
        gpa_weight,
        exam_weight,
    } = args;

    let defaults = MeritWeights::default();
    let weights = MeritWeights::new(
        gpa_weight.unwrap_or(defaults.gpa()),
        exam_weight.unwrap_or(defaults.exam()),
    )?;

    let store = FileKeyValueStore::open(&data_dir)?;
    let service = AdmissionService::new(Arc::new(store));
    let rows = service.merit(Some(weights))?;

    match output {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(&path)?);
            write_csv(&rows, &mut writer)?;
            writer.flush()?;
            println!("Wrote {} merit row(s) to {}", rows.len(), path.display());
        }
        None => write_csv(&rows, io::stdout().lock())?,
    }
    Ok(())
}

pub(crate) fn run_tuition(args: TuitionArgs) -> Result<(), AppError> {
    let quote = TuitionQuote::calculate(args.credits, args.per_credit_fee, args.scholarship)?;
    println!("Total tuition:       {} BDT", quote.total);
    println!("After scholarship:   {} BDT", quote.after_scholarship);
    println!("Per semester (x8):   {} BDT", quote.per_semester);
    Ok(())
}

fn demo_applicant(name: &str, education: &str, exam_roll: &str) -> ApplicantDetails {
    ApplicantDetails {
        name: name.to_string(),
        email: format!("{}@example.com", name.to_ascii_lowercase().replace(' ', ".")),
        phone: "+8801700000000".to_string(),
        guardian: "Guardian on file".to_string(),
        address: "Farmgate, Dhaka".to_string(),
        education: education.to_string(),
        exam_roll: exam_roll.to_string(),
    }
}

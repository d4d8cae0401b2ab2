//! Face Attendance CLI
//!
//! Terminal front end for the capture session: enroll subjects,
//! recognize faces, mark attendance and view today's status.

use clap::{Parser, Subcommand};
use face_attendance::{
    capture::{Camera, MockCamera},
    config::FileConfig,
    gateway::HttpGateway,
    session::{SessionController, SessionError, ViewKind},
    status::{AttendanceStatusCache, AttendanceStatusSnapshot},
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "face-attendance", version, about = "Face attendance capture client")]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the recognition service URL.
    #[arg(long)]
    base_url: Option<String>,

    /// Use a synthetic camera instead of a video device.
    #[arg(long)]
    mock_camera: bool,

    /// Serve Prometheus metrics on this port (0 disables).
    #[arg(long)]
    metrics_port: Option<u16>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive session (default).
    Interactive,
    /// Print today's attendance and exit.
    Status,
    /// List video devices.
    Devices,
}

const HELP: &str = "\
commands:
  enroll            start enrollment (opens camera)
  recognize         start recognition (opens camera)
  capture           take a photo
  clear             discard enrollment photos
  name <name>       set the name to enroll
  roll <roll>       set the roll to enroll
  submit            register the captured photos
  identify          send the photo for recognition
  mark              mark attendance for the recognized subject
  home              stop the camera and go home
  status            refresh today's attendance
  show              show the current session state
  quit              exit";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match FileConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config: {}", e);
                std::process::exit(1);
            }
        },
        None => FileConfig::default(),
    };
    if let Some(url) = cli.base_url.clone() {
        config.service.base_url = url;
    }
    if let Some(port) = cli.metrics_port {
        config.metrics.port = port;
    }
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    info!("Face Attendance v{}", face_attendance::VERSION);

    let gateway = match HttpGateway::new(&config.service) {
        Ok(gateway) => Arc::new(gateway),
        Err(e) => {
            eprintln!("Failed to create service client: {}", e);
            std::process::exit(1);
        }
    };
    info!(url = gateway.base_url(), "Using recognition service");

    match cli.command.unwrap_or(Command::Interactive) {
        Command::Devices => list_devices(),
        Command::Status => {
            let cache = AttendanceStatusCache::new(gateway, config.service.request_timeout());
            match cache.refresh().await {
                Ok(snapshot) => print_status(&snapshot),
                Err(e) => {
                    eprintln!("Failed to fetch attendance: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Command::Interactive => {
            let camera = build_camera(cli.mock_camera);
            let session = SessionController::open(
                camera,
                config.capture.clone(),
                gateway,
                config.service.request_timeout(),
            )
            .await;
            let metrics = start_metrics(config.metrics.port, &session);
            run_interactive(&session, metrics.as_ref()).await;
            session.go_home();
            info!(stats = ?session.camera_stats(), "Session closed");
        }
    }
}

fn build_camera(mock: bool) -> Box<dyn Camera> {
    #[cfg(feature = "camera")]
    {
        if !mock {
            return Box::new(face_attendance::capture::WebcamCamera::new());
        }
    }
    #[cfg(not(feature = "camera"))]
    {
        if !mock {
            warn!("Built without the `camera` feature, using a synthetic camera");
        }
    }
    Box::new(MockCamera::new())
}

fn list_devices() {
    #[cfg(feature = "camera")]
    {
        match face_attendance::capture::WebcamCamera::list_devices() {
            Ok(devices) if devices.is_empty() => println!("No video devices found"),
            Ok(devices) => devices.iter().for_each(|d| println!("{d}")),
            Err(e) => {
                eprintln!("Failed to list devices: {}", e);
                std::process::exit(1);
            }
        }
    }
    #[cfg(not(feature = "camera"))]
    {
        println!("Built without the `camera` feature; no devices available");
    }
}

/// Pushes session counters to the metrics exporter.
#[cfg_attr(not(feature = "metrics"), allow(dead_code))]
struct MetricsSink {
    #[cfg(feature = "metrics")]
    exporter: Arc<face_attendance::metrics::MetricsExporter>,
}

impl MetricsSink {
    fn publish(&self, session: &SessionController) {
        #[cfg(feature = "metrics")]
        {
            self.exporter
                .publish(face_attendance::metrics::MetricsSnapshot::from_session(session));
        }
        #[cfg(not(feature = "metrics"))]
        {
            let _ = session;
        }
    }
}

#[cfg(feature = "metrics")]
fn start_metrics(port: u16, session: &SessionController) -> Option<MetricsSink> {
    use face_attendance::metrics::{serve, MetricsExporter, MetricsRegistry};

    if port == 0 {
        return None;
    }
    let registry = match MetricsRegistry::new() {
        Ok(registry) => registry,
        Err(e) => {
            warn!(error = %e, "Metrics exporter disabled");
            return None;
        }
    };
    let exporter = Arc::new(MetricsExporter::new(
        registry,
        Arc::clone(session.status_cache()),
    ));
    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));
    let served = Arc::clone(&exporter);
    tokio::spawn(async move {
        if let Err(e) = serve(addr, served).await {
            warn!(error = %e, "Metrics exporter stopped");
        }
    });

    let sink = MetricsSink { exporter };
    sink.publish(session);
    Some(sink)
}

#[cfg(not(feature = "metrics"))]
fn start_metrics(port: u16, _session: &SessionController) -> Option<MetricsSink> {
    if port != 0 {
        warn!(port, "Built without the `metrics` feature, metrics are not exported");
    }
    None
}

async fn run_interactive(session: &SessionController, metrics: Option<&MetricsSink>) {
    // Ctrl-C returns home (releasing the camera) before exit
    let (interrupt_tx, mut interrupt_rx) = tokio::sync::mpsc::unbounded_channel();
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = interrupt_tx.send(());
    }) {
        warn!(error = %e, "Could not install Ctrl-C handler");
    }

    println!("{HELP}");
    if let Some(snapshot) = session.status_snapshot() {
        print_status(&snapshot);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt(session.view());
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = interrupt_rx.recv() => {
                println!();
                info!("Interrupted");
                break;
            }
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Failed to read input");
                break;
            }
        };

        let outcome = tokio::select! {
            outcome = dispatch(session, line.trim()) => outcome,
            _ = interrupt_rx.recv() => {
                println!();
                info!("Interrupted while waiting on the service");
                break;
            }
        };
        match outcome {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) if e.needs_user_fix() => println!("! {e}"),
            Err(e) => println!("error: {e}"),
        }

        if let Some(metrics) = metrics {
            metrics.publish(session);
        }
    }
}

fn prompt(view: ViewKind) {
    use std::io::Write;
    print!("[{view}]> ");
    let _ = std::io::stdout().flush();
}

/// Runs one command. Returns false to exit.
async fn dispatch(session: &SessionController, line: &str) -> Result<bool, SessionError> {
    let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
    match command {
        "" => {}
        "help" => println!("{HELP}"),
        "enroll" => {
            session.start_enrollment()?;
            println!("Enrollment started: capture photos, then set name and roll");
        }
        "recognize" => {
            session.start_recognition()?;
            println!("Recognition started: capture a photo, then identify");
        }
        "capture" => {
            let held = session.capture_photo()?;
            match session.view() {
                ViewKind::Enrolling => println!("{held} photo(s) captured"),
                _ => println!("Photo captured"),
            }
        }
        "clear" => {
            session.clear_photos()?;
            println!("Photos cleared");
        }
        "name" => session.set_name(rest.trim())?,
        "roll" => session.set_roll_id(rest.trim())?,
        "submit" => {
            let message = session.submit_enrollment().await?;
            println!("{message}");
        }
        "identify" => {
            let result = session.recognize().await?;
            println!("{result}");
            if result.recognized() {
                println!("Use `mark` to record attendance");
            }
        }
        "mark" => {
            let mark = session.mark_attendance().await?;
            println!("{}", mark.message);
            if let Some(snapshot) = mark.snapshot {
                print_status(&snapshot);
            }
        }
        "home" => session.go_home(),
        "status" => {
            let snapshot = session.refresh_status().await?;
            print_status(&snapshot);
        }
        "show" => show(session),
        "quit" | "exit" => return Ok(false),
        other => println!("unknown command `{other}`, try `help`"),
    }
    Ok(true)
}

fn show(session: &SessionController) {
    println!("view: {}", session.view());
    println!("camera: {}", if session.is_camera_streaming() { "on" } else { "off" });
    match session.view() {
        ViewKind::Home => {}
        ViewKind::Enrolling => {
            if let Some((name, roll)) = session.subject_fields() {
                println!("name: {name:?}  roll: {roll:?}");
            }
            println!("photos: {}", session.captured_count());
        }
        ViewKind::Recognizing => {
            println!("photo: {}", if session.captured_count() > 0 { "yes" } else { "no" });
            match session.recognition_result() {
                Some(result) => println!("{result}"),
                None => println!("not identified yet"),
            }
        }
    }
}

fn print_status(snapshot: &AttendanceStatusSnapshot) {
    println!(
        "Today's attendance (as of {}):",
        snapshot.fetched_at.format("%H:%M:%S")
    );
    println!("  Attended today:");
    for subject in &snapshot.attended {
        println!("    {subject}");
    }
    println!("  Not attended yet:");
    for subject in &snapshot.not_attended {
        println!("    {subject}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use face_attendance::capture::{CaptureConfig, CapturedImage};
    use face_attendance::gateway::{
        EnrollmentSubject, GatewayError, RecognitionResult, VerificationGateway,
    };
    use face_attendance::session::Action;
    use face_attendance::status::Subject;
    use std::time::Duration;

    struct OneRegistered;

    #[async_trait]
    impl VerificationGateway for OneRegistered {
        async fn enroll(&self, _: &EnrollmentSubject) -> Result<String, GatewayError> {
            Ok("Registered".to_string())
        }

        async fn recognize(&self, _: &CapturedImage) -> Result<RecognitionResult, GatewayError> {
            Ok(RecognitionResult::NoMatch { message: None })
        }

        async fn mark_attendance(&self, _: &Subject) -> Result<String, GatewayError> {
            Ok("marked".to_string())
        }

        async fn fetch_status(&self) -> Result<AttendanceStatusSnapshot, GatewayError> {
            Ok(AttendanceStatusSnapshot::new(
                vec![],
                vec![Subject::new("Asha", "101")],
            ))
        }
    }

    fn session() -> SessionController {
        SessionController::new(
            Box::new(MockCamera::new()),
            CaptureConfig::with_dimensions(8, 8),
            Arc::new(OneRegistered),
            Duration::from_secs(1),
        )
    }

    #[tokio::test]
    async fn test_status_command_refreshes_cache() {
        let session = session();
        assert_eq!(dispatch(&session, "status").await, Ok(true));

        let snapshot = session.status_snapshot().unwrap();
        assert_eq!(snapshot.not_attended, vec![Subject::new("Asha", "101")]);
    }

    #[tokio::test]
    async fn test_enroll_flow_through_commands() {
        let session = session();
        for line in ["enroll", "capture", "name Asha", "roll 101"] {
            assert_eq!(dispatch(&session, line).await, Ok(true), "{line}");
        }
        assert_eq!(
            session.subject_fields(),
            Some(("Asha".to_string(), "101".to_string()))
        );

        assert_eq!(dispatch(&session, "submit").await, Ok(true));
        assert_eq!(session.view(), ViewKind::Home);
        assert!(!session.is_camera_streaming());
    }

    #[tokio::test]
    async fn test_command_errors_and_quit() {
        let session = session();
        assert!(matches!(
            dispatch(&session, "capture").await,
            Err(SessionError::InvalidState {
                action: Action::CapturePhoto,
                view: ViewKind::Home
            })
        ));
        assert_eq!(dispatch(&session, "bogus").await, Ok(true));
        assert_eq!(dispatch(&session, "quit").await, Ok(false));
    }
}

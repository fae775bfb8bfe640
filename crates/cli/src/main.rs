use std::fs;
use std::path::PathBuf;
use std::process;

use clap::Parser;

use whisperguard_core::audio::infrastructure::energy_vad::EnergyVad;
use whisperguard_core::audio::infrastructure::ffmpeg_audio_reader::FfmpegAudioReader;
use whisperguard_core::audio::infrastructure::ffmpeg_cli::FfmpegCli;
use whisperguard_core::audio::infrastructure::separator_factory::create_separator;
use whisperguard_core::audio::infrastructure::wav_file_writer::WavFileWriter;
use whisperguard_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use whisperguard_core::pipeline::transcribe_use_case::{
    OutputKind, TranscribeRequest, TranscribeUseCase,
};
use whisperguard_core::shared::config::TranscribeConfig;
use whisperguard_core::shared::constants::DEFAULT_MODEL_SIZE;
use whisperguard_core::shared::model_resolver;
use whisperguard_core::transcription::domain::inference_engine::InferenceEngine;
use whisperguard_core::transcription::domain::speech_recognizer::EngineCapability;
use whisperguard_core::transcription::infrastructure::gladia_transcriber::GladiaTranscriber;
use whisperguard_core::transcription::infrastructure::whisper_recognizer::WhisperRecognizer;

/// Hallucination-resistant transcription and subtitling with Whisper.
#[derive(Parser)]
#[command(name = "whisperguard")]
struct Cli {
    /// Input audio or video file.
    input: PathBuf,

    /// Output language.
    #[arg(long, default_value = "en")]
    lang: String,

    /// Spoken language, if different from --lang.
    #[arg(long)]
    lang_input: Option<String>,

    /// Treat the input as music (no voice-activity trimming, remixed subtitles).
    #[arg(long)]
    music: bool,

    /// Also produce subtitles.
    #[arg(long, conflicts_with = "only_srt")]
    srt: bool,

    /// Produce subtitles only.
    #[arg(long)]
    only_srt: bool,

    /// Initial prompt for the recognizer.
    #[arg(long)]
    prompt: Option<String>,

    /// Start offset in seconds.
    #[arg(long, default_value = "0")]
    begin: f64,

    /// End offset in seconds.
    #[arg(long)]
    end: Option<f64>,

    /// Tempo stretch factor applied before transcription.
    #[arg(long)]
    stretch: Option<f64>,

    /// Reject inputs longer than this many seconds.
    #[arg(long)]
    max_duration: Option<u64>,

    /// Number of inference runs per pass.
    #[arg(long, default_value = "1")]
    nb_run: usize,

    /// Accompaniment weight when remixing music (0.0-1.0).
    #[arg(long)]
    remix_factor: Option<f64>,

    /// Skip speech normalization of the vocals before remixing.
    #[arg(long)]
    no_speechnorm: bool,

    /// Subtitle line width in characters.
    #[arg(long)]
    max_line_width: Option<usize>,

    /// Subtitle lines per cue.
    #[arg(long)]
    max_line_count: Option<usize>,

    /// Whisper model file (skips the model cache).
    #[arg(long)]
    model: Option<PathBuf>,

    /// Whisper model size to fetch into the cache: tiny, base, small, medium, large.
    #[arg(long, default_value = DEFAULT_MODEL_SIZE)]
    model_size: String,

    /// Engine capability: segment, word or translate.
    #[arg(long, default_value = "word")]
    capability: String,

    /// JSON configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the JSON result here instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let config = TranscribeConfig::load(cli.config.as_deref())?;
    let capability = parse_capability(&cli.capability);
    let model_path = match &cli.model {
        Some(path) => path.clone(),
        None => resolve_model(&cli.model_size)?,
    };
    let recognizer = WhisperRecognizer::new(&model_path, Box::new(FfmpegAudioReader), capability)?;

    let mut use_case = TranscribeUseCase::new(
        config.clone(),
        InferenceEngine::new(Box::new(recognizer)),
        Box::new(FfmpegCli::new(config.ffmpeg.clone())),
        Box::new(FfmpegAudioReader),
        Box::new(WavFileWriter),
    )
    .with_separator(create_separator(&config.separator))
    .with_vad(Box::new(EnergyVad::new(
        config.vad_rms_threshold,
        config.vad_min_silence_ms,
    )));
    if config.remote.enabled {
        use_case = use_case.with_remote(Box::new(GladiaTranscriber::new(&config.remote)));
    }

    let request = build_request(&cli);
    let mut logger = StdoutPipelineLogger::new();
    let result = use_case.run(&cli.input, &request, &mut logger);

    let json = serde_json::to_string_pretty(&result)?;
    match &cli.output {
        Some(path) => {
            fs::write(path, json)?;
            log::info!("Output written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn build_request(cli: &Cli) -> TranscribeRequest {
    let mut request = TranscribeRequest::new(cli.lang.clone());
    request.input_language = cli.lang_input.clone();
    request.prompt = cli.prompt.clone();
    request.is_music = cli.music;
    request.output = if cli.only_srt {
        OutputKind::SubtitlesOnly
    } else if cli.srt {
        OutputKind::TextAndSubtitles
    } else {
        OutputKind::Text
    };
    request.begin_secs = cli.begin;
    request.end_secs = cli.end;
    request.stretch = cli.stretch;
    request.max_duration_secs = cli.max_duration;
    request.runs = cli.nb_run;
    request.remix_factor = cli.remix_factor;
    request.speech_norm = cli.no_speechnorm.then_some(false);
    request.max_line_width = cli.max_line_width;
    request.max_line_count = cli.max_line_count;
    request
}

fn resolve_model(size: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let name = model_resolver::model_file_name(size);
    log::info!("Resolving model: {name}");
    let path = model_resolver::resolve(
        &name,
        &model_resolver::model_url(&name),
        None,
        Some(Box::new(download_progress)),
    )?;
    eprintln!();
    Ok(path)
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.input.exists() {
        return Err(format!("Input file not found: {}", cli.input.display()).into());
    }
    if let Some(model) = &cli.model {
        if !model.exists() {
            return Err(format!("Model file not found: {}", model.display()).into());
        }
    }
    if cli.begin < 0.0 {
        return Err(format!("Begin must be non-negative, got {}", cli.begin).into());
    }
    if let Some(end) = cli.end {
        if end <= cli.begin {
            return Err(format!("End ({end}) must be after begin ({})", cli.begin).into());
        }
    }
    if let Some(factor) = cli.stretch {
        if factor <= 0.0 {
            return Err(format!("Stretch must be positive, got {factor}").into());
        }
    }
    if let Some(factor) = cli.remix_factor {
        if !(0.0..=1.0).contains(&factor) {
            return Err(format!("Remix factor must be between 0.0 and 1.0, got {factor}").into());
        }
    }
    if cli.nb_run == 0 {
        return Err("--nb-run must be at least 1".into());
    }
    if cli.max_line_width == Some(0) || cli.max_line_count == Some(0) {
        return Err("Subtitle line width and count must be positive".into());
    }
    let valid_capabilities = ["segment", "word", "translate"];
    if !valid_capabilities.contains(&cli.capability.as_str()) {
        return Err(format!(
            "Capability must be one of: segment, word, translate, got '{}'",
            cli.capability
        )
        .into());
    }
    Ok(())
}

fn parse_capability(name: &str) -> EngineCapability {
    match name {
        "segment" => EngineCapability::SegmentTimestamped,
        "translate" => EngineCapability::TranslationOnly,
        _ => EngineCapability::WordTimestamped,
    }
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading Whisper model... {pct}%");
    } else {
        eprint!("\rDownloading Whisper model... {downloaded} bytes");
    }
}

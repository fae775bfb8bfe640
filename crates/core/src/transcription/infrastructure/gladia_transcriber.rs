//! HTTP adapter for the Gladia v2 pre-recorded transcription API.

use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;

use reqwest::blocking::{multipart, Client, Response};
use serde::Deserialize;
use serde_json::json;

use crate::shared::config::RemoteSettings;
use crate::transcription::domain::remote_transcriber::{RemoteError, RemoteTranscriber};
use crate::transcription::domain::transcription_result::{Segment, TranscriptionResult, Word};

const KEY_HEADER: &str = "x-gladia-key";

pub struct GladiaTranscriber {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    poll_interval: Duration,
    max_attempts: u32,
}

impl GladiaTranscriber {
    pub fn new(settings: &RemoteSettings) -> Self {
        Self {
            client: Client::new(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            poll_interval: Duration::from_secs(settings.poll_interval_secs),
            max_attempts: settings.max_poll_attempts,
        }
    }

    fn key(&self) -> Result<&str, RemoteError> {
        self.api_key.as_deref().ok_or(RemoteError::MissingKey)
    }

    fn upload(&self, audio: &Path) -> Result<String, RemoteError> {
        let url = format!("{}/upload", self.base_url);
        let bytes = fs::read(audio).map_err(|source| RemoteError::Read {
            path: audio.to_path_buf(),
            source,
        })?;
        let file_name = audio
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio.wav".to_string());
        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("audio/wav")
            .map_err(|e| transport(&url, e))?;
        let form = multipart::Form::new().part("audio", part);

        log::debug!("uploading {} to {url}", audio.display());
        let response = self
            .client
            .post(&url)
            .header(KEY_HEADER, self.key()?)
            .multipart(form)
            .send()
            .map_err(|e| transport(&url, e))?;
        let body: UploadResponse = json_body(&url, response)?;
        Ok(body.audio_url)
    }

    fn request(&self, audio_url: &str, source: &str, target: &str) -> Result<String, RemoteError> {
        let url = format!("{}/pre-recorded", self.base_url);
        let payload = json!({
            "audio_url": audio_url,
            "detect_language": true,
            "language": source,
            "translation": true,
            "translation_config": {
                "target_languages": [target],
                "model": "base",
                "match_original_utterances": true,
            },
            "diarization": true,
            "subtitles": true,
            "subtitles_config": {
                "formats": ["srt"],
            },
        });
        let response = self
            .client
            .post(&url)
            .header(KEY_HEADER, self.key()?)
            .json(&payload)
            .send()
            .map_err(|e| transport(&url, e))?;
        let body: JobResponse = json_body(&url, response)?;
        Ok(body.result_url)
    }

    fn poll(&self, result_url: &str) -> Result<ResultPayload, RemoteError> {
        for attempt in 1..=self.max_attempts {
            let response = self
                .client
                .get(result_url)
                .header(KEY_HEADER, self.key()?)
                .send()
                .map_err(|e| transport(result_url, e))?;
            let payload: ResultPayload = json_body(result_url, response)?;
            match payload.status.as_str() {
                "done" => return Ok(payload),
                "error" => {
                    return Err(RemoteError::Payload {
                        url: result_url.to_string(),
                        message: "job failed".to_string(),
                    })
                }
                status => {
                    log::info!(
                        "remote result not ready (status {status}, attempt {attempt}/{}); waiting {:?}",
                        self.max_attempts,
                        self.poll_interval
                    );
                    thread::sleep(self.poll_interval);
                }
            }
        }
        Err(RemoteError::NotReady {
            attempts: self.max_attempts,
        })
    }
}

impl RemoteTranscriber for GladiaTranscriber {
    fn transcribe(
        &self,
        audio: &Path,
        source_language: &str,
        target_language: &str,
    ) -> Result<TranscriptionResult, RemoteError> {
        self.key()?;
        let audio_url = self.upload(audio)?;
        let result_url = self.request(&audio_url, source_language, target_language)?;
        let payload = self.poll(&result_url)?;
        Ok(map_result(&payload.result, target_language))
    }
}

fn transport(url: &str, e: reqwest::Error) -> RemoteError {
    RemoteError::Transport {
        url: url.to_string(),
        message: e.to_string(),
    }
}

fn json_body<T: for<'de> Deserialize<'de>>(url: &str, response: Response) -> Result<T, RemoteError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(RemoteError::Status {
            url: url.to_string(),
            status: status.as_u16(),
            body,
        });
    }
    response.json().map_err(|e| RemoteError::Payload {
        url: url.to_string(),
        message: e.to_string(),
    })
}

#[derive(Deserialize)]
struct UploadResponse {
    audio_url: String,
}

#[derive(Deserialize)]
struct JobResponse {
    result_url: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ResultPayload {
    status: String,
    result: JobResult,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub(crate) struct JobResult {
    transcription: Option<Transcript>,
    translation: Option<Translation>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Translation {
    results: Vec<TranslatedTranscript>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct TranslatedTranscript {
    languages: Vec<String>,
    #[serde(flatten)]
    transcript: Transcript,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Transcript {
    full_transcript: String,
    utterances: Vec<Utterance>,
    subtitles: Vec<Subtitle>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Utterance {
    start: f64,
    end: f64,
    text: String,
    words: Vec<UtteranceWord>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct UtteranceWord {
    word: String,
    start: f64,
    end: f64,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Subtitle {
    format: String,
    subtitles: String,
}

/// Translation for `target_language` when the service returned one, else
/// the plain transcription. Missing parts map to empty values.
pub(crate) fn map_result(result: &JobResult, target_language: &str) -> TranscriptionResult {
    let translated = result.translation.as_ref().and_then(|t| {
        t.results
            .iter()
            .find(|r| r.languages.iter().any(|l| l.eq_ignore_ascii_case(target_language)))
    });
    let Some(transcript) = translated
        .map(|t| &t.transcript)
        .or(result.transcription.as_ref())
    else {
        return TranscriptionResult::empty();
    };

    TranscriptionResult {
        text: transcript.full_transcript.clone(),
        srt: transcript
            .subtitles
            .iter()
            .find(|s| s.format == "srt")
            .map(|s| s.subtitles.clone())
            .unwrap_or_default(),
        segments: transcript
            .utterances
            .iter()
            .map(|u| Segment {
                start: u.start,
                end: u.end,
                sentence: u.text.trim().to_string(),
                words: u
                    .words
                    .iter()
                    .map(|w| Word {
                        start: w.start,
                        end: w.end,
                        text: w.word.trim().to_string(),
                    })
                    .collect(),
            })
            .collect(),
    }
}

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use aura_realtime::config::{Config, INPUT_CHUNK_SIZE, OUTPUT_CHUNK_SIZE, OUTPUT_LATENCY_MS};
use aura_realtime::engine::{default_session_config, SessionEngine};
use aura_realtime::pipeline::DistillerClient;
use aura_realtime::playback::PlaybackSink;
use aura_realtime::tools::UiEvent;
use aura_realtime::types::journal::{AuraMemory, SessionRecord};
use aura_realtime::utils;
use aura_realtime::utils::audio::{SERVICE_INPUT_SAMPLE_RATE, SERVICE_OUTPUT_SAMPLE_RATE};
use aura_realtime::vad::VadConfig;
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{FrameCount, StreamConfig};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd};
use rubato::{FastFixedIn, Resampler};
use tracing_subscriber::fmt::time::ChronoLocal;

/// Ring-buffer half the engine plays into. `clear` bumps the shared epoch so
/// the output callback drops whatever is still queued.
struct RingBufferSink {
    producer: HeapProd<f32>,
    epoch: Arc<AtomicU64>,
    resampler: FastFixedIn<f32>,
}

impl PlaybackSink for RingBufferSink {
    fn play(&mut self, samples: &[f32]) {
        let chunk_size = self.resampler.input_frames_next();
        for chunk in utils::audio::split_for_chunks(samples, chunk_size) {
            if let Ok(resampled) = self.resampler.process(&[chunk.as_slice()], None) {
                if let Some(resampled) = resampled.first() {
                    for &sample in resampled {
                        if self.producer.try_push(sample).is_err() {
                            tracing::warn!("output buffer full, dropping audio");
                            return;
                        }
                    }
                }
            }
        }
    }

    fn clear(&mut self) {
        self.epoch.fetch_add(1, Ordering::Release);
    }
}

/// Consumer half used by the output device callback.
struct RingBufferSource {
    consumer: HeapCons<f32>,
    epoch: Arc<AtomicU64>,
    seen_epoch: u64,
}

impl RingBufferSource {
    fn next_sample(&mut self) -> f32 {
        let epoch = self.epoch.load(Ordering::Acquire);
        if epoch != self.seen_epoch {
            self.seen_epoch = epoch;
            while self.consumer.try_pop().is_some() {}
        }
        self.consumer.try_pop().unwrap_or(0.0)
    }
}

enum Input {
    Audio(Vec<f32>),
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("Failed to load application configuration")?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    tracing::info!("Starting Aura journal session...");

    let (input_tx, mut input_rx) = tokio::sync::mpsc::channel::<Input>(1024);

    // Setup audio input device.
    let input = utils::device::get_or_default_input(None)
        .map_err(|e| aura_realtime::SessionError::MicrophoneAccess(e.to_string()))?;
    tracing::info!("Using input device: {:?}", &input.name()?);

    let input_config = input
        .default_input_config()
        .context("Failed to get default input config")?;
    let input_config = StreamConfig {
        channels: input_config.channels(),
        sample_rate: input_config.sample_rate(),
        buffer_size: cpal::BufferSize::Fixed(FrameCount::from(INPUT_CHUNK_SIZE as u32)),
    };
    let input_channel_count = input_config.channels as usize;
    let input_sample_rate = input_config.sample_rate.0 as f64;
    tracing::info!("Input stream config: {:?}", &input_config);

    // Mix down to mono and hand the chunk to the session loop.
    let audio_input = input_tx.clone();
    let input_data_fn = move |data: &[f32], _: &cpal::InputCallbackInfo| {
        let audio = if input_channel_count > 1 {
            data.chunks(input_channel_count)
                .map(|c| c.iter().sum::<f32>() / input_channel_count as f32)
                .collect::<Vec<f32>>()
        } else {
            data.to_vec()
        };
        if let Err(e) = audio_input.try_send(Input::Audio(audio)) {
            tracing::warn!("Failed to send audio data to buffer: {:?}", e);
        }
    };
    let input_stream = input.build_input_stream(
        &input_config,
        input_data_fn,
        move |err| tracing::error!("An error occurred on input stream: {}", err),
        None,
    )?;
    input_stream.play()?;

    // Setup audio output device.
    let output = utils::device::get_or_default_output(None)
        .context("Failed to get default audio output device")?;
    tracing::info!("Using output device: {:?}", &output.name()?);

    let output_config = output
        .default_output_config()
        .context("Failed to get default output config")?;
    let output_config = StreamConfig {
        channels: output_config.channels(),
        sample_rate: output_config.sample_rate(),
        buffer_size: cpal::BufferSize::Fixed(FrameCount::from(OUTPUT_CHUNK_SIZE as u32)),
    };
    let output_channel_count = output_config.channels as usize;
    let output_sample_rate = output_config.sample_rate.0 as f64;
    tracing::info!("Output stream config: {:?}", &output_config);

    let audio_out_buffer =
        utils::audio::shared_buffer(output_sample_rate as usize * OUTPUT_LATENCY_MS / 1000);
    let (audio_out_tx, audio_out_rx) = audio_out_buffer.split();
    let epoch = Arc::new(AtomicU64::new(0));

    let sink = RingBufferSink {
        producer: audio_out_tx,
        epoch: epoch.clone(),
        resampler: utils::audio::create_resampler(
            SERVICE_OUTPUT_SAMPLE_RATE,
            output_sample_rate,
            100,
        )?,
    };
    let mut source = RingBufferSource {
        consumer: audio_out_rx,
        epoch,
        seen_epoch: 0,
    };

    let output_data_fn = move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
        let mut sample_index = 0;
        while sample_index < data.len() {
            let sample = source.next_sample();
            // Left channel (ch:0).
            data[sample_index] = sample;
            sample_index += 1;
            // Right channel (ch:1), if it exists.
            if output_channel_count > 1 && sample_index < data.len() {
                data[sample_index] = sample;
                sample_index += 1;
            }
            // Ignore other channels.
            sample_index += output_channel_count.saturating_sub(2);
        }
    };
    let output_stream = output.build_output_stream(
        &output_config,
        output_data_fn,
        move |err| tracing::error!("An error occurred on output stream: {}", err),
        None,
    )?;
    output_stream.play()?;

    // Connect to the speech model service.
    let client = aura_realtime::connect()
        .await
        .context("Failed to connect to the speech service")?;
    let mut server_events = client
        .server_events()
        .context("Failed to get server events channel")?;

    let distiller = Arc::new(DistillerClient::new(
        config.api_key.clone(),
        config.chat_model.clone(),
    ));
    let (ui_tx, mut ui_rx) = tokio::sync::mpsc::channel::<UiEvent>(32);

    let mut engine = SessionEngine::new(sink, distiller, ui_tx).with_vad_config(VadConfig {
        threshold: config.vad_threshold,
    });

    let memory = AuraMemory::default();
    engine
        .start(
            client,
            default_session_config(&memory),
            SessionRecord::new("voice journal".to_string()),
        )
        .await?;

    let mut in_resampler = utils::audio::create_resampler(
        input_sample_rate,
        SERVICE_INPUT_SAMPLE_RATE,
        INPUT_CHUNK_SIZE,
    )?;

    let mut mic_buffer: VecDeque<f32> = VecDeque::with_capacity(INPUT_CHUNK_SIZE * 2);
    let mut exercise_deadline: Option<tokio::time::Instant> = None;

    loop {
        tokio::select! {
            maybe_input = input_rx.recv() => {
                let Some(Input::Audio(audio)) = maybe_input else { break };
                mic_buffer.extend(audio);
                let mut resampled: Vec<f32> = vec![];
                while mic_buffer.len() >= INPUT_CHUNK_SIZE {
                    let chunk: Vec<f32> = mic_buffer.drain(..INPUT_CHUNK_SIZE).collect();
                    if let Ok(resamples) = in_resampler.process(&[chunk.as_slice()], None) {
                        if let Some(resamples) = resamples.first() {
                            resampled.extend(resamples.iter().cloned());
                        }
                    }
                }
                if !resampled.is_empty() {
                    if let Err(e) = engine.handle_audio_chunk(&resampled).await {
                        tracing::error!("Failed to send audio: {}", e);
                    }
                }
            }
            event = server_events.recv() => {
                match event {
                    Ok(event) => engine.handle_server_event(event).await,
                    Err(e) => {
                        tracing::warn!("Server event stream ended: {}", e);
                        break;
                    }
                }
            }
            maybe_ui = ui_rx.recv() => {
                match maybe_ui {
                    Some(UiEvent::BreathingExercise { args }) => {
                        let cycles = args.get("cycles").and_then(|v| v.as_u64()).unwrap_or(3);
                        tracing::info!("Breathing exercise: {} slow breaths, in through the nose...", cycles);
                        exercise_deadline = Some(
                            tokio::time::Instant::now() + std::time::Duration::from_secs(cycles * 10),
                        );
                    }
                    Some(UiEvent::CrisisResources) => {
                        tracing::warn!("If you are in crisis, call or text 988 (Suicide & Crisis Lifeline).");
                    }
                    Some(UiEvent::DistortionFlagged(distortion)) => {
                        tracing::info!("Noticed a thinking pattern ({}): \"{}\"", distortion.kind, distortion.statement);
                    }
                    None => break,
                }
            }
            _ = async move {
                match exercise_deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => std::future::pending().await,
                }
            } => {
                exercise_deadline = None;
                tracing::info!("Breathing exercise complete.");
                if let Err(e) = engine.finish_breathing_exercise().await {
                    tracing::warn!("Failed to acknowledge exercise: {}", e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl-C, shutting down...");
                break;
            }
        }
    }

    // Release the audio devices before closing the session connection.
    drop(input_stream);
    drop(output_stream);
    engine.stop(false).await;
    if let Some(summary) = &engine.session().summary {
        tracing::info!("Session recap: {}", summary);
    }
    tracing::info!("Shutting down...");
    Ok(())
}

//! Job Command Handlers
//!
//! ProcessJobHandler 是 worker 的核心流程：
//! 解析 → 下载参考音频 → 推理 → 编码 → 上传 → 写回状态与结果

use chrono::Local;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

use crate::application::commands::job_commands::*;
use crate::application::error::ApplicationError;
use crate::application::ports::{
    AudioEncoderPort, AudioFetcherPort, EncodeError, FetchError, InferParams, InferRequest,
    JobQueuePort, ObjectStoragePort, ReferenceAudio, StorageError, TtsEnginePort, TtsError,
};
use crate::domain::{
    result_object_key, AudioFormat, JobError, RetCode, StatusRecord, TaskResult, TtsJob,
    ValidJob, DEFAULT_RESULT_PREFIX,
};

/// 流程中各阶段的错误
#[derive(Debug, Error)]
enum PipelineError {
    #[error("download {url} failed: {source}")]
    Download {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("{0}")]
    Inference(TtsError),

    #[error("upload {key} failed: {source}")]
    Upload {
        key: String,
        #[source]
        source: StorageError,
    },

    #[error("{0}")]
    Encode(#[from] EncodeError),
}

/// 处理任务的固定参数
#[derive(Debug, Clone)]
pub struct ProcessJobSettings {
    pub params: InferParams,
    pub format: AudioFormat,
    /// 结果文件 key 前缀
    pub key_prefix: String,
}

impl Default for ProcessJobSettings {
    fn default() -> Self {
        Self {
            params: InferParams::default(),
            format: AudioFormat::Wav,
            key_prefix: DEFAULT_RESULT_PREFIX.to_string(),
        }
    }
}

struct Uploaded {
    object_key: String,
    file_url: String,
}

/// ProcessJob Handler - 处理单个队列任务
pub struct ProcessJobHandler {
    queue: Arc<dyn JobQueuePort>,
    fetcher: Arc<dyn AudioFetcherPort>,
    tts_engine: Arc<dyn TtsEnginePort>,
    encoder: Arc<dyn AudioEncoderPort>,
    storage: Arc<dyn ObjectStoragePort>,
    settings: ProcessJobSettings,
}

impl ProcessJobHandler {
    pub fn new(
        queue: Arc<dyn JobQueuePort>,
        fetcher: Arc<dyn AudioFetcherPort>,
        tts_engine: Arc<dyn TtsEnginePort>,
        encoder: Arc<dyn AudioEncoderPort>,
        storage: Arc<dyn ObjectStoragePort>,
        settings: ProcessJobSettings,
    ) -> Self {
        Self {
            queue,
            fetcher,
            tts_engine,
            encoder,
            storage,
            settings,
        }
    }

    /// 处理任务，永不返回错误：所有失败都写回到队列
    pub async fn handle(&self, cmd: ProcessJobCommand) -> JobOutcome {
        let job = match TtsJob::from_payload(&cmd.payload) {
            Ok(job) => job,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    payload = %String::from_utf8_lossy(&cmd.payload),
                    "Failed to parse job payload, skipping"
                );
                return JobOutcome::Skipped {
                    reason: e.to_string(),
                };
            }
        };

        let job = match job.validate() {
            Ok(job) => job,
            Err(JobError::MissingField { task_id, field }) => {
                let msg = format!("任务参数缺失: {}", field);
                tracing::warn!(task_id = %task_id, field = field, "Job rejected");
                self.report(
                    &task_id,
                    Some(StatusRecord::fail(RetCode::ErrorParam, msg.clone())),
                    TaskResult::failure(Some(task_id.clone()), msg.clone()),
                )
                .await;
                return JobOutcome::Failed {
                    task_id,
                    stage: FailureStage::Validation,
                    message: msg,
                };
            }
            Err(e) => {
                tracing::error!(error = %e, "Job cannot be reported, skipping");
                return JobOutcome::Skipped {
                    reason: e.to_string(),
                };
            }
        };

        let started = Instant::now();
        tracing::info!(
            task_id = %job.task_id,
            person_id = %job.person_id,
            text_len = job.content.chars().count(),
            "Processing job"
        );

        match self.synthesize(&job).await {
            Ok(uploaded) => {
                self.report(
                    &job.task_id,
                    Some(StatusRecord::uploaded(&uploaded.file_url)),
                    TaskResult::success(job.task_id.clone(), uploaded.file_url.clone()),
                )
                .await;

                tracing::info!(
                    task_id = %job.task_id,
                    object_key = %uploaded.object_key,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Job completed"
                );

                JobOutcome::Succeeded {
                    task_id: job.task_id,
                    object_key: uploaded.object_key,
                    file_url: uploaded.file_url,
                }
            }
            Err(e) => self.fail(&job, e).await,
        }
    }

    async fn synthesize(&self, job: &ValidJob) -> Result<Uploaded, PipelineError> {
        let reference = self
            .fetcher
            .fetch(&job.audio_file_url)
            .await
            .map_err(|source| PipelineError::Download {
                url: job.audio_file_url.clone(),
                source,
            })?;

        tracing::info!(
            task_id = %job.task_id,
            size = reference.len(),
            "Reference audio fetched"
        );

        let request = InferRequest {
            text: job.content.clone(),
            references: vec![ReferenceAudio {
                audio: reference,
                text: job.audio_text.clone(),
            }],
            params: self.settings.params.clone(),
            format: self.settings.format,
        };

        let response = self
            .tts_engine
            .infer(request)
            .await
            .map_err(PipelineError::Inference)?;

        if response.audio.is_empty() {
            return Err(PipelineError::Inference(TtsError::InvalidResponse(
                "engine returned no audio".to_string(),
            )));
        }

        let encoded = self.encoder.encode(response.audio, self.settings.format)?;

        tracing::info!(
            task_id = %job.task_id,
            size = encoded.data.len(),
            duration_ms = ?encoded.duration_ms.or(response.duration_ms),
            "Inference completed"
        );

        let object_key = result_object_key(
            &self.settings.key_prefix,
            &Local::now(),
            &job.person_id,
            &job.task_id,
            encoded.format,
        );

        tracing::info!(task_id = %job.task_id, object_key = %object_key, "Uploading result");

        self.storage
            .put_object(&object_key, encoded.data, encoded.format.content_type())
            .await
            .map_err(|source| PipelineError::Upload {
                key: object_key.clone(),
                source,
            })?;

        let file_url = self.storage.object_url(&object_key);
        Ok(Uploaded {
            object_key,
            file_url,
        })
    }

    async fn fail(&self, job: &ValidJob, error: PipelineError) -> JobOutcome {
        let task_id = job.task_id.clone();
        let (stage, message, status) = match &error {
            PipelineError::Download { url, .. } => {
                let msg = format!("文件不存在，或者下载错误,url:{}", url);
                (FailureStage::Download, msg.clone(), Some(msg))
            }
            PipelineError::Inference(e) => {
                let msg = match e {
                    TtsError::InferenceFailed(reason) => reason.clone(),
                    other => other.to_string(),
                };
                (FailureStage::Inference, msg.clone(), Some(msg))
            }
            PipelineError::Upload { key, .. } => {
                let msg = format!("上传文件 {} 到 COS 失败", key);
                (FailureStage::Upload, msg.clone(), Some(msg))
            }
            // 其余错误只推送结果，不写状态
            PipelineError::Encode(e) => (
                FailureStage::Internal,
                format!("处理 Redis 队列任务时出错: {}", e),
                None,
            ),
        };

        tracing::error!(
            task_id = %task_id,
            stage = stage.as_str(),
            error = %error,
            "Job failed"
        );

        self.report(
            &task_id,
            status.map(|msg| StatusRecord::fail(RetCode::Fail, msg)),
            TaskResult::failure(Some(task_id.clone()), message.clone()),
        )
        .await;

        JobOutcome::Failed {
            task_id,
            stage,
            message,
        }
    }

    /// 写回状态与结果，写回失败只记录日志
    async fn report(&self, task_id: &str, status: Option<StatusRecord>, result: TaskResult) {
        if let Some(status) = status {
            tracing::info!(task_id = %task_id, status = %status.to_json(), "Updating task status");
            if let Err(e) = self.queue.put_status(task_id, &status).await {
                tracing::error!(task_id = %task_id, error = %e, "Failed to write task status");
            }
        }

        if let Err(e) = self.queue.push_result(&result).await {
            tracing::error!(task_id = %task_id, error = %e, "Failed to push task result");
        }
    }
}

/// SubmitJob Handler - 校验并推入任务队列
pub struct SubmitJobHandler {
    queue: Arc<dyn JobQueuePort>,
}

impl SubmitJobHandler {
    pub fn new(queue: Arc<dyn JobQueuePort>) -> Self {
        Self { queue }
    }

    pub async fn handle(&self, cmd: SubmitJobCommand) -> Result<SubmitJobResponse, ApplicationError> {
        let mut job = cmd.job;
        if job.task_id.as_deref().map_or(true, |id| id.trim().is_empty()) {
            job.task_id = Some(uuid::Uuid::new_v4().to_string());
        }

        let valid = job.validate()?;
        let payload = serde_json::to_vec(&job)
            .map_err(|e| ApplicationError::internal(format!("Failed to encode job: {}", e)))?;

        self.queue.enqueue(&payload).await?;

        tracing::info!(task_id = %valid.task_id, "Job submitted");
        Ok(SubmitJobResponse {
            task_id: valid.task_id,
        })
    }
}

use crate::domain::model::BatchStatistics;
use std::fmt;
use std::time::Duration;
#[cfg(feature = "cli")]
use std::sync::Mutex;
#[cfg(feature = "cli")]
use std::time::Instant;
#[cfg(feature = "cli")]
use sysinfo::{Pid, RefreshKind, System};

/// 管線的各個階段，監控輸出以此標示
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EtlPhase {
    Start,
    Extract,
    Transform,
    Load,
}

impl fmt::Display for EtlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EtlPhase::Start => "Start",
            EtlPhase::Extract => "Extract",
            EtlPhase::Transform => "Transform",
            EtlPhase::Load => "Load",
        };
        f.write_str(label)
    }
}

/// 每秒處理筆數；時間太短量不到時回傳 None
pub fn records_per_second(records: usize, elapsed: Duration) -> Option<f64> {
    let seconds = elapsed.as_secs_f64();
    if records == 0 || seconds < 1e-6 {
        return None;
    }
    Some(records as f64 / seconds)
}

/// 每筆紀錄平均佔用的峰值記憶體（KB）
pub fn memory_per_record_kb(peak_memory_mb: u64, records: usize) -> Option<f64> {
    if records == 0 {
        return None;
    }
    Some(peak_memory_mb as f64 * 1024.0 / records as f64)
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone)]
pub struct ProcessSample {
    pub cpu_usage: f32,
    pub memory_usage_mb: u64,
    pub memory_usage_percent: f32,
    pub peak_memory_mb: u64,
    pub elapsed_time: Duration,
}

#[cfg(feature = "cli")]
pub struct SystemMonitor {
    system: Mutex<System>,
    pid: Option<Pid>,
    start_time: Instant,
    phase_started: Mutex<Instant>,
    peak_memory: Mutex<u64>,
    enabled: bool,
}

#[cfg(feature = "cli")]
impl SystemMonitor {
    pub fn new(enabled: bool) -> Self {
        let mut system = System::new_with_specifics(RefreshKind::everything());

        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                tracing::warn!("🔶 System monitor cannot resolve current PID: {}", e);
                None
            }
        };

        if enabled {
            system.refresh_all();
        }

        let now = Instant::now();
        Self {
            system: Mutex::new(system),
            pid,
            start_time: now,
            phase_started: Mutex::new(now),
            peak_memory: Mutex::new(0),
            enabled,
        }
    }

    pub fn sample(&self) -> Option<ProcessSample> {
        if !self.enabled {
            return None;
        }

        let mut system = self.system.lock().ok()?;
        system.refresh_all();

        let process = system.process(self.pid?)?;
        let memory_mb = process.memory() / 1024 / 1024;
        let total_memory = system.total_memory() / 1024 / 1024;
        let memory_percent = if total_memory > 0 {
            (memory_mb as f32 / total_memory as f32) * 100.0
        } else {
            0.0
        };

        let mut peak = self.peak_memory.lock().ok()?;
        *peak = (*peak).max(memory_mb);

        Some(ProcessSample {
            cpu_usage: process.cpu_usage(),
            memory_usage_mb: memory_mb,
            memory_usage_percent: memory_percent,
            peak_memory_mb: *peak,
            elapsed_time: self.start_time.elapsed(),
        })
    }

    /// 記錄階段結束時的資源用量與該階段處理的筆數
    pub fn log_phase(&self, phase: EtlPhase, records: usize) {
        if !self.enabled {
            return;
        }
        let phase_elapsed = match self.phase_started.lock() {
            Ok(mut started) => {
                let elapsed = started.elapsed();
                *started = Instant::now();
                elapsed
            }
            Err(_) => return,
        };
        let Some(sample) = self.sample() else {
            return;
        };

        let rate = records_per_second(records, phase_elapsed)
            .map(|r| format!(" ({:.0} records/s)", r))
            .unwrap_or_default();
        tracing::info!(
            "📊 {} - {} records{}, CPU: {:.1}%, Memory: {}MB ({:.1}%), Peak: {}MB, Time: {:?}",
            phase,
            records,
            rate,
            sample.cpu_usage,
            sample.memory_usage_mb,
            sample.memory_usage_percent,
            sample.peak_memory_mb,
            sample.elapsed_time
        );
    }

    pub fn log_final_stats(&self, stats: &BatchStatistics) {
        if let Some(sample) = self.sample() {
            let per_record = memory_per_record_kb(sample.peak_memory_mb, stats.records_extracted)
                .map(|kb| format!(", {:.1} KB/record", kb))
                .unwrap_or_default();
            tracing::info!(
                "📊 Final Stats - {} files, {} records in {:?}, Peak Memory: {}MB{}",
                stats.files_processed + stats.files_failed,
                stats.records_extracted,
                sample.elapsed_time,
                sample.peak_memory_mb,
                per_record
            );
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(feature = "cli")]
impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

// 非 CLI 建置沒有 sysinfo，提供空實現
#[cfg(not(feature = "cli"))]
#[derive(Default)]
pub struct SystemMonitor;

#[cfg(not(feature = "cli"))]
impl SystemMonitor {
    pub fn new(_enabled: bool) -> Self {
        Self
    }

    pub fn log_phase(&self, _phase: EtlPhase, _records: usize) {}

    pub fn log_final_stats(&self, _stats: &BatchStatistics) {}

    pub fn is_enabled(&self) -> bool {
        false
    }
}

//! 並行実行するコマンドの出力に行単位でプレフィックスを付ける
//!
//! コマンドごとに [`GroupedLogger`] を1つ持つ。ロガーは生の出力を行に切り分け、
//! 完成した行を共有の [`LineSink`] に渡し、シンクは1行をまとめて書き出す。
//! 異なるグループの行が交互に並ぶことはあっても、1行が分断されることはない。

use crate::group::Group;
use colored::Colorize;
use std::io::{self, IsTerminal, Write};
use std::sync::{Arc, Mutex, PoisonError};

/// 全ロガーで共有する出力先。1回の呼び出しで1行を丸ごと書く
pub trait LineSink: Send + Sync {
    fn write_line(&self, group: &Group, line: &str);
}

/// 標準出力に `[<group>] <line>` を書く
pub struct StdoutSink {
    color: bool,
}

impl StdoutSink {
    /// 標準出力が端末ならプレフィックスに色を付ける
    pub fn new() -> Self {
        Self {
            color: io::stdout().is_terminal(),
        }
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LineSink for StdoutSink {
    fn write_line(&self, group: &Group, line: &str) {
        let prefix = format!("[{}]", group);
        let mut out = io::stdout().lock();

        // stdoutが閉じられてもビルドは失敗させない
        let _ = if self.color {
            writeln!(out, "{} {}", prefix.cyan(), line)
        } else {
            writeln!(out, "{} {}", prefix, line)
        };
    }
}

/// 全行をメモリに保持する（主にテスト用）
#[derive(Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// これまでに書かれた行（[`StdoutSink`] と同じ形式、色なし）
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl LineSink for MemorySink {
    fn write_line(&self, group: &Group, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(format!("[{}] {}", group, line));
    }
}

/// コマンドの生の出力をプレフィックス付きの行に分割する
///
/// 最後の改行より後ろのバイトは、続きの出力が来るか
/// finish（またはdrop）されるまで保留する。
pub struct GroupedLogger {
    group: Group,
    sink: Arc<dyn LineSink>,
    pending: Vec<u8>,
}

impl GroupedLogger {
    pub fn new(group: Group, sink: Arc<dyn LineSink>) -> Self {
        Self {
            group,
            sink,
            pending: Vec::new(),
        }
    }

    pub fn write_chunk(&mut self, chunk: &[u8]) {
        let mut rest = chunk;

        while let Some(pos) = rest.iter().position(|b| *b == b'\n') {
            self.pending.extend_from_slice(&rest[..pos]);
            self.emit();
            rest = &rest[pos + 1..];
        }

        self.pending.extend_from_slice(rest);
    }

    /// 改行で終わっていない末尾の行を出力する
    pub fn finish(&mut self) {
        if !self.pending.is_empty() {
            self.emit();
        }
    }

    fn emit(&mut self) {
        let line = String::from_utf8_lossy(&self.pending);
        let line = line.strip_suffix('\r').unwrap_or(&line);
        self.sink.write_line(&self.group, line);
        self.pending.clear();
    }
}

impl Write for GroupedLogger {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_chunk(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for GroupedLogger {
    fn drop(&mut self) {
        self.finish();
    }
}

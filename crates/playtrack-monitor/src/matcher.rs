//! 경로 정규화 및 프로세스 매칭.
//!
//! 게임 모니터의 체크 루프와 폴링 폴백이 같은 정규화 규칙을 공유한다.
//! 명령줄은 두 경로 모두 "실행 파일 경로로 시작"을 일치로 본다.

use playtrack_core::models::game::{MonitorMode, MonitorTarget};
use playtrack_core::models::process::{MonitoredProcess, ProcessEntry};

/// 경로 정규화
///
/// 양끝 공백/따옴표 제거, `\`를 `/`로 통일, 연속 구분자 축약, 소문자화,
/// 끝 구분자 제거.
pub fn normalize_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches(|c: char| c == '"' || c == '\'').trim();

    let mut out = String::with_capacity(trimmed.len());
    let mut prev_sep = false;
    for ch in trimmed.chars() {
        let ch = if ch == '\\' { '/' } else { ch };
        if ch == '/' {
            if prev_sep {
                continue;
            }
            prev_sep = true;
        } else {
            prev_sep = false;
        }
        out.extend(ch.to_lowercase());
    }

    while out.len() > 1 && out.ends_with('/') {
        out.pop();
    }
    out
}

/// 프로세스 이름 비교 (대소문자 무시)
pub fn name_matches(process_name: &str, expected: &str) -> bool {
    process_name.trim().to_lowercase() == expected.trim().to_lowercase()
}

/// `path`가 `folder` 자체이거나 그 하위인지 (경로 구성요소 경계 기준, 정규화된 값)
pub fn is_within(path: &str, folder: &str) -> bool {
    if folder.is_empty() {
        return false;
    }
    match path.strip_prefix(folder) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || folder.ends_with('/'),
        None => false,
    }
}

/// 명령줄이 실행 파일 경로로 시작하는지 (정규화된 값)
fn command_starts_with(command_line: &str, target: &str) -> bool {
    match command_line.strip_prefix(target) {
        Some(rest) => rest.is_empty() || rest.starts_with([' ', '"', '\'', '\t']),
        None => false,
    }
}

/// 게임 모니터 체크 루프용 매칭
///
/// 프로세스 이름 모드는 이름만, 그 외에는 실행 경로 정확 일치 또는
/// 명령줄이 해당 경로로 시작(인자 허용).
pub fn matches_descriptor(descriptor: &MonitoredProcess, entry: &ProcessEntry) -> bool {
    if descriptor.is_process_name_mode {
        return name_matches(&entry.name, &descriptor.path);
    }

    let target = normalize_path(&descriptor.path);
    if target.is_empty() {
        return false;
    }
    entry
        .executable_path
        .as_deref()
        .is_some_and(|exe| normalize_path(exe) == target)
        || entry
            .command_line
            .as_deref()
            .is_some_and(|cmd| command_starts_with(&normalize_path(cmd), &target))
}

/// 폴링 폴백용 매칭
///
/// - `process`: 프로세스 이름 일치
/// - `folder`: 실행 경로/명령줄이 폴더 하위
/// - `file`: 실행 경로 일치 또는 명령줄이 해당 파일로 시작
pub fn matches_target(target: &MonitorTarget, entry: &ProcessEntry) -> bool {
    if !target.is_configured() {
        return false;
    }

    match target.monitor_mode {
        MonitorMode::Process => name_matches(&entry.name, &target.monitor_path),
        MonitorMode::Folder => {
            let folder = normalize_path(&target.monitor_path);
            entry
                .executable_path
                .as_deref()
                .is_some_and(|exe| is_within(&normalize_path(exe), &folder))
                || entry
                    .command_line
                    .as_deref()
                    .is_some_and(|cmd| is_within(&normalize_path(cmd), &folder))
        }
        MonitorMode::File => {
            let file = normalize_path(&target.monitor_path);
            entry
                .executable_path
                .as_deref()
                .is_some_and(|exe| normalize_path(exe) == file)
                || entry
                    .command_line
                    .as_deref()
                    .is_some_and(|cmd| command_starts_with(&normalize_path(cmd), &file))
        }
    }
}

//! 摘要提示词

use crate::models::NotableLineSet;

const PREAMBLE: &str = "\
You are a system health monitor and log forensics expert. Dissect the log lines below \
and deliver a clear, actionable summary. Be concise but comprehensive.

Answer in Markdown using exactly these sections:

### Timeline Snapshot
- The primary time range of significant events.

### Critical Alarms
- The most severe errors (CRITICAL, FATAL, ERROR) and the nature of each.

### Warnings & Potential Bottlenecks
- Warnings or early indicators of problems such as resource pressure, throttling or low disk space.

### Underlying Causes
- The most probable root causes. Synthesize across lines rather than listing them.

### Recommended Actions
- A prioritized list of steps for investigation and resolution.
";

/// 构建发送给模型的提示词
pub fn build_summary_prompt(notable: &NotableLineSet) -> String {
    let mut prompt = String::with_capacity(PREAMBLE.len() + notable.len() * 96);
    prompt.push_str(PREAMBLE);

    if notable.truncated() {
        prompt.push_str(&format!(
            "\nOnly the first {} of {} notable lines are included.\n",
            notable.len(),
            notable.total_notable
        ));
    }

    prompt.push_str("\n---\nLog lines to analyze:\n");
    prompt.push_str(&notable.as_prompt_block());
    prompt.push_str("\n---\n");
    prompt
}

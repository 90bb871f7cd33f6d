//! HTML report generation using Tera

use crate::error::Result;
use crate::models::{Finding, Severity};
use chrono::Local;
use std::path::Path;
use tera::{Context, Tera};
use tracing::info;

/// Renders a standalone HTML report from finalized findings.
pub fn generate(results: &[Finding], targets: &[String], output_path: &Path) -> Result<()> {
    let mut sorted = results.to_vec();
    crate::report::sort_results(&mut sorted);

    let mut tera = Tera::default();
    tera.add_raw_template("report.html", TEMPLATE)?;

    let count = |sev: Severity| sorted.iter().filter(|f| f.severity == sev).count();

    let mut context = Context::new();
    context.insert("targets", targets);
    context.insert("results", &sorted);
    context.insert("total_findings", &sorted.len());
    context.insert("critical_count", &count(Severity::Critical));
    context.insert("high_count", &count(Severity::High));
    context.insert("medium_count", &count(Severity::Medium));
    context.insert("low_count", &count(Severity::Low));
    context.insert("info_count", &count(Severity::Info));
    context.insert(
        "secrets_count",
        &sorted.iter().filter(|f| f.secret_found).count(),
    );
    context.insert("generated_at", &Local::now().to_rfc3339());
    context.insert("version", env!("CARGO_PKG_VERSION"));

    let rendered = tera.render("report.html", &context)?;
    std::fs::write(output_path, rendered)?;
    info!("HTML report saved to {}", output_path.display());
    Ok(())
}

const TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Talos Scan Report</title>
    <style>
        * { box-sizing: border-box; margin: 0; padding: 0; }
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; background: #f1f5f9; color: #1e293b; line-height: 1.6; }
        .container { max-width: 1200px; margin: 0 auto; padding: 20px; }
        .header { background: linear-gradient(135deg, #0f172a 0%, #1e293b 100%); color: white; padding: 36px 28px; border-radius: 12px; margin-bottom: 24px; }
        .header h1 { font-size: 1.6em; }
        .header p { color: #94a3b8; font-size: 0.9em; }
        .tiles { display: grid; grid-template-columns: repeat(auto-fit, minmax(140px, 1fr)); gap: 12px; margin-bottom: 24px; }
        .tile { background: white; border-radius: 10px; padding: 16px; text-align: center; border-top: 4px solid #6b7280; }
        .tile .num { font-size: 1.8em; font-weight: 700; }
        .tile.critical { border-color: #dc2626; } .tile.critical .num { color: #dc2626; }
        .tile.high { border-color: #ea580c; } .tile.high .num { color: #ea580c; }
        .tile.medium { border-color: #ca8a04; } .tile.medium .num { color: #ca8a04; }
        .tile.low { border-color: #2563eb; } .tile.low .num { color: #2563eb; }
        .tile.info { border-color: #6b7280; } .tile.info .num { color: #6b7280; }
        table { width: 100%; border-collapse: collapse; background: white; border-radius: 10px; overflow: hidden; }
        th { background: #0f172a; color: white; text-align: left; padding: 10px 12px; font-size: 0.85em; }
        td { padding: 8px 12px; border-bottom: 1px solid #e2e8f0; font-size: 0.85em; word-break: break-all; }
        .sev { padding: 2px 8px; border-radius: 4px; color: white; font-size: 0.8em; text-transform: uppercase; }
        .sev-critical { background: #dc2626; } .sev-high { background: #ea580c; }
        .sev-medium { background: #ca8a04; } .sev-low { background: #2563eb; } .sev-info { background: #6b7280; }
        .badge { display: inline-block; background: #e2e8f0; border-radius: 4px; padding: 1px 6px; margin-right: 4px; font-size: 0.75em; }
        .footer { color: #64748b; text-align: center; padding: 16px; font-size: 0.8em; }
    </style>
</head>
<body>
<div class="container">
    <div class="header">
        <h1>Talos Scan Report</h1>
        <p>{% for target in targets %}{{ target }}{% if not loop.last %}, {% endif %}{% endfor %}</p>
        <p>Generated {{ generated_at }}</p>
    </div>
    <div class="tiles">
        <div class="tile critical"><div class="num">{{ critical_count }}</div><div>Critical</div></div>
        <div class="tile high"><div class="num">{{ high_count }}</div><div>High</div></div>
        <div class="tile medium"><div class="num">{{ medium_count }}</div><div>Medium</div></div>
        <div class="tile low"><div class="num">{{ low_count }}</div><div>Low</div></div>
        <div class="tile info"><div class="num">{{ info_count }}</div><div>Info</div></div>
        <div class="tile"><div class="num">{{ secrets_count }}</div><div>Secrets</div></div>
    </div>
    <table>
        <tr><th>Severity</th><th>Status</th><th>Method</th><th>URL</th><th>Size</th><th>Tags</th></tr>
        {% for r in results %}
        <tr>
            <td><span class="sev sev-{{ r.severity }}">{{ r.severity }}</span></td>
            <td>{{ r.status_code }}</td>
            <td>{{ r.method }}</td>
            <td>{{ r.url }}</td>
            <td>{{ r.size }}</td>
            <td>{% for tag in r.tags %}<span class="badge">{{ tag }}</span>{% endfor %}
                {% if r.waf_detected %}<span class="badge">WAF: {{ r.waf_detected }}</span>{% endif %}</td>
        </tr>
        {% endfor %}
    </table>
    <div class="footer">{{ total_findings }} findings &middot; Talos v{{ version }}</div>
</div>
</body>
</html>
"#;

//! Chart generators: one aggregate query each, returning plotly traces.
//!
//! Rows with an empty `date` are excluded from every time-based aggregate —
//! an empty date means "unknown", not epoch. Chat messages are identified
//! by the provider label `Chat`.

use serde_json::json;

use crate::error::Result;
use crate::report::{Chart, ReportContext};

const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// Bar chart of the most frequent senders, owner excluded.
pub fn top_senders(ctx: &ReportContext) -> Result<Chart> {
    let mut stmt = ctx.conn.prepare(
        "SELECT from_address, COUNT(*) AS total
         FROM messages
         WHERE from_address <> ''
           AND (?1 = '' OR from_address NOT LIKE '%' || ?1 || '%')
         GROUP BY from_address
         ORDER BY total DESC
         LIMIT ?2",
    )?;
    let rows: Vec<(String, i64)> = stmt
        .query_map((&ctx.owner, ctx.top_limit as i64), |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?
        .collect::<rusqlite::Result<_>>()?;

    Ok(bar_chart(
        "top_senders",
        "Top Senders",
        "Sender",
        "Messages received from",
        &rows,
    ))
}

/// Bar chart of the most frequent recipients, owner excluded.
///
/// Queries the per-recipient rows, not the combined `to` summary string, so
/// each address counts once per message regardless of list position.
pub fn top_recipients(ctx: &ReportContext) -> Result<Chart> {
    let mut stmt = ctx.conn.prepare(
        "SELECT CASE WHEN name <> '' THEN name || ' <' || address || '>' ELSE address END,
                COUNT(*) AS total
         FROM recipients
         WHERE address <> ''
           AND (?1 = '' OR address NOT LIKE '%' || ?1 || '%')
         GROUP BY address
         ORDER BY total DESC
         LIMIT ?2",
    )?;
    let rows: Vec<(String, i64)> = stmt
        .query_map((&ctx.owner, ctx.top_limit as i64), |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?
        .collect::<rusqlite::Result<_>>()?;

    Ok(bar_chart(
        "top_recipients",
        "Top Recipients",
        "Recipient",
        "Messages sent to",
        &rows,
    ))
}

/// Stacked bar chart of chat vs. mail volume per day of the week.
pub fn messages_by_day_of_week(ctx: &ReportContext) -> Result<Chart> {
    let rows = chat_mail_rows(
        ctx,
        "SELECT strftime('%w', date) AS dow,
                COUNT(CASE WHEN labels LIKE '%Chat%' THEN 1 END),
                COUNT(CASE WHEN labels NOT LIKE '%Chat%' THEN 1 END)
         FROM messages
         WHERE date <> ''
         GROUP BY dow
         ORDER BY dow ASC",
    )?;

    let labels: Vec<&str> = rows
        .iter()
        .filter_map(|(dow, _, _)| dow.parse::<usize>().ok())
        .map(|i| DAY_NAMES[i % 7])
        .collect();
    let chats: Vec<i64> = rows.iter().map(|r| r.1).collect();
    let mails: Vec<i64> = rows.iter().map(|r| r.2).collect();

    let traces = if rows.is_empty() {
        vec![]
    } else {
        vec![
            json!({"type": "bar", "name": "Chat messages", "x": labels, "y": chats}),
            json!({"type": "bar", "name": "Mail messages", "x": labels, "y": mails}),
        ]
    };

    Ok(Chart {
        name: "messages_by_day_of_week",
        traces,
        layout: json!({
            "title": "Chat vs. Mail by Day of Week",
            "barmode": "stack",
            "xaxis": {"title": "Day of the week"},
            "yaxis": {"title": "Messages exchanged"},
        }),
    })
}

/// Filled scatter of chat and mail volume per hour of the day (UTC).
pub fn messages_by_hour(ctx: &ReportContext) -> Result<Chart> {
    let rows = chat_mail_rows(
        ctx,
        "SELECT strftime('%H', date) AS hour,
                COUNT(CASE WHEN labels LIKE '%Chat%' THEN 1 END),
                COUNT(CASE WHEN labels NOT LIKE '%Chat%' THEN 1 END)
         FROM messages
         WHERE date <> ''
         GROUP BY hour
         ORDER BY hour ASC",
    )?;

    let hours: Vec<&str> = rows.iter().map(|r| r.0.as_str()).collect();
    let chats: Vec<i64> = rows.iter().map(|r| r.1).collect();
    let mails: Vec<i64> = rows.iter().map(|r| r.2).collect();

    let traces = if rows.is_empty() {
        vec![]
    } else {
        vec![
            json!({"type": "scatter", "name": "Chat messages", "x": hours, "y": chats, "fill": "tozeroy"}),
            json!({"type": "scatter", "name": "Mail messages", "x": hours, "y": mails, "fill": "tonexty"}),
        ]
    };

    Ok(Chart {
        name: "messages_by_hour",
        traces,
        layout: json!({
            "title": "Activity by Hour of Day (UTC)",
            "xaxis": {"title": "Hour of day (UTC)"},
            "yaxis": {"title": "Messages"},
        }),
    })
}

/// Chat vs. mail usage over time, by year and month.
pub fn chat_vs_mail_monthly(ctx: &ReportContext) -> Result<Chart> {
    usage_over_time(ctx, false)
}

/// Cumulative variant of [`chat_vs_mail_monthly`].
pub fn chat_vs_mail_cumulative(ctx: &ReportContext) -> Result<Chart> {
    usage_over_time(ctx, true)
}

fn usage_over_time(ctx: &ReportContext, cumulative: bool) -> Result<Chart> {
    let rows = chat_mail_rows(
        ctx,
        "SELECT strftime('%Y-%m', date) AS period,
                COUNT(CASE WHEN labels LIKE '%Chat%' THEN 1 END),
                COUNT(CASE WHEN labels NOT LIKE '%Chat%' THEN 1 END)
         FROM messages
         WHERE date <> ''
         GROUP BY period
         ORDER BY period ASC",
    )?;

    let periods: Vec<&str> = rows.iter().map(|r| r.0.as_str()).collect();
    let mut chats: Vec<i64> = Vec::with_capacity(rows.len());
    let mut mails: Vec<i64> = Vec::with_capacity(rows.len());
    let (mut chat_total, mut mail_total) = (0i64, 0i64);
    for (_, chat, mail) in &rows {
        chat_total += chat;
        mail_total += mail;
        if cumulative {
            chats.push(chat_total);
            mails.push(mail_total);
        } else {
            chats.push(*chat);
            mails.push(*mail);
        }
    }

    let (name, title) = if cumulative {
        ("chat_vs_mail_cumulative", "Chat vs. Mail Usage (Cumulative)")
    } else {
        ("chat_vs_mail_monthly", "Chat vs. Mail Usage")
    };

    let mut chat_trace =
        json!({"type": "scatter", "name": "Chats", "x": periods, "y": chats});
    let mut mail_trace =
        json!({"type": "scatter", "name": "Mails", "x": periods, "y": mails});
    if cumulative {
        chat_trace["fill"] = json!("tonexty");
        mail_trace["fill"] = json!("tozeroy");
    }

    let traces = if rows.is_empty() {
        vec![]
    } else {
        vec![chat_trace, mail_trace]
    };

    Ok(Chart {
        name,
        traces,
        layout: json!({
            "title": title,
            "xaxis": {"title": "Year and month"},
            "yaxis": {"title": "Number of messages"},
        }),
    })
}

/// Pie chart of chat thread durations, bucketed.
pub fn thread_durations(ctx: &ReportContext) -> Result<Chart> {
    let mut stmt = ctx.conn.prepare(
        "SELECT strftime('%s', MAX(date)) - strftime('%s', MIN(date)) AS duration
         FROM messages
         WHERE labels LIKE '%Chat%' AND date <> '' AND thread_id <> ''
         GROUP BY thread_id
         HAVING duration > 0",
    )?;
    let durations: Vec<i64> = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<_>>()?;

    const BUCKETS: [(&str, i64); 4] = [
        ("<= 1 min.", 60),
        ("1 - 10 mins.", 600),
        ("10 - 30 mins.", 1800),
        ("30 mins. - 1 hr.", 3600),
    ];
    let mut counts = [0i64; 5];
    for d in &durations {
        let idx = BUCKETS
            .iter()
            .position(|(_, limit)| d <= limit)
            .unwrap_or(4);
        counts[idx] += 1;
    }

    let labels: Vec<&str> = BUCKETS
        .iter()
        .map(|(label, _)| *label)
        .chain(std::iter::once("> 1 hr."))
        .collect();

    let traces = if durations.is_empty() {
        vec![]
    } else {
        vec![json!({"type": "pie", "labels": labels, "values": counts.to_vec()})]
    };

    Ok(Chart {
        name: "thread_durations",
        traces,
        layout: json!({"title": "Chat Thread Durations"}),
    })
}

/// Bubble scatter of chat thread sizes (message count) over time.
pub fn thread_sizes(ctx: &ReportContext) -> Result<Chart> {
    let mut stmt = ctx.conn.prepare(
        "SELECT strftime('%Y-%m-%d', MIN(date)) AS day,
                COUNT(message_key) AS size,
                GROUP_CONCAT(DISTINCT from_address) AS participants
         FROM messages
         WHERE labels LIKE '%Chat%' AND date <> '' AND thread_id <> ''
         GROUP BY thread_id
         ORDER BY day ASC",
    )?;
    let rows: Vec<(String, i64, String)> = stmt
        .query_map([], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            ))
        })?
        .collect::<rusqlite::Result<_>>()?;

    let dates: Vec<&str> = rows.iter().map(|r| r.0.as_str()).collect();
    let sizes: Vec<i64> = rows.iter().map(|r| r.1).collect();
    let marker_sizes: Vec<i64> = sizes.iter().map(|s| (s / 5).max(10)).collect();
    let descriptions: Vec<String> = rows
        .iter()
        .map(|(day, size, participants)| {
            format!(
                "Messages: {size}<br>Date: {day}<br>Participants:<br> - {}",
                participants.replace(',', "<br> - ")
            )
        })
        .collect();

    let traces = if rows.is_empty() {
        vec![]
    } else {
        vec![json!({
            "type": "scatter",
            "mode": "markers",
            "x": dates,
            "y": sizes,
            "marker": {"size": marker_sizes},
            "text": descriptions,
        })]
    };

    Ok(Chart {
        name: "thread_sizes",
        traces,
        layout: json!({
            "title": "Chat Thread Sizes",
            "hovermode": "closest",
            "xaxis": {"title": "Date"},
            "yaxis": {"title": "Messages in thread"},
        }),
    })
}

/// Run a `(text, chat_count, mail_count)` aggregate query.
fn chat_mail_rows(ctx: &ReportContext, sql: &str) -> Result<Vec<(String, i64, i64)>> {
    let mut stmt = ctx.conn.prepare(sql)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
        .collect::<rusqlite::Result<_>>()?;
    Ok(rows)
}

/// Build a simple single-trace bar chart from `(label, count)` rows.
fn bar_chart(
    name: &'static str,
    title: &str,
    x_title: &str,
    y_title: &str,
    rows: &[(String, i64)],
) -> Chart {
    let traces = if rows.is_empty() {
        vec![]
    } else {
        let labels: Vec<&str> = rows.iter().map(|r| r.0.as_str()).collect();
        let counts: Vec<i64> = rows.iter().map(|r| r.1).collect();
        vec![json!({"type": "bar", "x": labels, "y": counts})]
    };

    Chart {
        name,
        traces,
        layout: json!({
            "title": title,
            "xaxis": {"title": x_title},
            "yaxis": {"title": y_title},
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReportConfig;
    use crate::report::ReportContext;
    use rusqlite::Connection;

    fn seeded_context() -> ReportContext {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(crate::store::sqlite::SCHEMA).unwrap();
        conn.execute_batch(
            "INSERT INTO messages VALUES
                (0, 'a@x.com', 'me@g.com', 's1', '2024-01-01 10:00:00', 't1', 'Inbox'),
                (1, 'a@x.com', 'me@g.com', 's2', '2024-01-01 10:05:00', 't1', 'Chat'),
                (2, 'b@y.com', 'me@g.com', 's3', '2024-01-02 11:00:00', 't1', 'Chat'),
                (3, 'c@z.com', 'me@g.com', 's4', '', 't2', 'Sent');
             INSERT INTO recipients VALUES
                (0, '', 'me@g.com', 'To'),
                (1, '', 'me@g.com', 'To'),
                (2, '', 'me@g.com', 'To'),
                (3, 'Bob', 'bob@x.com', 'To');",
        )
        .unwrap();
        ReportContext {
            conn,
            owner: String::new(),
            top_limit: 10,
        }
    }

    #[test]
    fn test_top_senders_orders_by_count() {
        let ctx = seeded_context();
        let chart = top_senders(&ctx).unwrap();
        assert_eq!(chart.traces.len(), 1);
        let x = chart.traces[0]["x"].as_array().unwrap();
        assert_eq!(x[0], "a@x.com");
    }

    #[test]
    fn test_owner_exclusion() {
        let mut ctx = seeded_context();
        ctx.owner = "a@x.com".to_string();
        let chart = top_senders(&ctx).unwrap();
        let x = chart.traces[0]["x"].as_array().unwrap();
        assert!(x.iter().all(|v| v != "a@x.com"));
    }

    #[test]
    fn test_empty_dates_are_excluded_from_time_charts() {
        let ctx = seeded_context();
        let chart = chat_vs_mail_monthly(&ctx).unwrap();
        let x = chart.traces[0]["x"].as_array().unwrap();
        // Message 3 has an empty date and must not contribute a period
        assert_eq!(x.len(), 1);
        assert_eq!(x[0], "2024-01");
    }

    #[test]
    fn test_thread_durations_buckets() {
        let ctx = seeded_context();
        let chart = thread_durations(&ctx).unwrap();
        // t1 spans 10:00 → 11:00 next day, i.e. > 1 hr bucket
        let values = chart.traces[0]["values"].as_array().unwrap();
        assert_eq!(values[4], 1);
    }

    #[test]
    fn test_empty_store_yields_no_traces() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(crate::store::sqlite::SCHEMA).unwrap();
        let ctx = ReportContext {
            conn,
            owner: String::new(),
            top_limit: 10,
        };
        assert!(top_senders(&ctx).unwrap().traces.is_empty());
        assert!(thread_sizes(&ctx).unwrap().traces.is_empty());
    }

    #[test]
    fn test_generate_charts_respects_cumulative_toggle() {
        let ctx = seeded_context();
        let without = ReportConfig {
            cumulative: false,
            ..Default::default()
        };
        let charts = ctx.generate_charts(&without).unwrap();
        assert!(charts.iter().all(|c| c.name != "chat_vs_mail_cumulative"));

        let with = ReportConfig::default();
        let charts = ctx.generate_charts(&with).unwrap();
        assert!(charts.iter().any(|c| c.name == "chat_vs_mail_cumulative"));
    }
}

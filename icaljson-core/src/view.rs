//! 日历事件视图
use std::{cmp::Ordering, collections::BTreeMap, sync::LazyLock};

use chrono::{Days, NaiveDate, NaiveDateTime};
use regex::{Captures, Regex};
use serde::Serialize;

use crate::{Error, IcalNode, Result};

/// 提供日期范围的事件标签
const CLIENT_INFO_TAG: &str = "clientinfo";

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w\S*").unwrap());

/// 日历视图
#[derive(Debug, Clone, Serialize)]
pub struct CalendarView {
    /// 日历名称 (X-WR-CALNAME)
    pub name: Option<String>,
    /// 模板名称 (X-TEMPLATE)
    pub template: String,
    /// 语言 (X-LANG)
    pub lang: String,
    /// 按开始时间排序的事件
    pub events: Vec<EventView>,
    /// `clientinfo` 事件覆盖的日期，从开始日起逐日列出
    pub days: Vec<NaiveDate>,
}

/// 单个事件的扁平视图
#[derive(Debug, Clone, Serialize)]
pub struct EventView {
    /// 排序后的序号，从1开始
    pub sequence: usize,
    /// X-CARLTAG，缺省为 `event-<序号>`
    pub tag: String,
    /// SUMMARY
    pub summary: Option<String>,
    /// URL
    pub url: Option<String>,
    /// 反转义后的地点
    pub location: String,
    /// DTSTART 原始值
    pub start: Option<String>,
    /// DTEND 原始值
    pub end: Option<String>,
    /// DTSTART 的 TZID 参数
    pub start_timezone: Option<String>,
    /// DTEND 的 TZID 参数
    pub end_timezone: Option<String>,
    /// HH:MM
    pub start_time: Option<String>,
    /// HH:MM
    pub end_time: Option<String>,
    /// 不做时区换算
    pub starts_at: Option<NaiveDateTime>,
    /// 不做时区换算
    pub ends_at: Option<NaiveDateTime>,
    /// 持续分钟数
    pub duration_minutes: Option<i64>,
    /// 距上一个事件结束的分钟数，第一个事件为空
    pub wait_minutes: Option<i64>,
    /// 描述中 `键: 值` 形式的行
    pub fields: BTreeMap<String, String>,
}

impl CalendarView {
    /// 从解码后的根节点构建视图
    pub fn from_node(root: &IcalNode) -> Result<Self> {
        let calendar = root
            .blocks("VCALENDAR")
            .first()
            .ok_or(Error::MissingCalendar)?;

        let mut template = None;
        let mut lang = None;
        let mut events = Vec::new();

        for event in calendar.blocks("VEVENT") {
            // 空值不覆盖之前的设置
            if let Some(value) = event.text("X-TEMPLATE").filter(|v| !v.is_empty()) {
                template = Some(value.to_string());
            }
            if let Some(value) = event.text("X-LANG").filter(|v| !v.is_empty()) {
                lang = Some(value.to_string());
            }
            events.push(EventView::from_node(event));
        }

        if events.is_empty() {
            return Err(Error::NoEvents);
        }
        let template = template.ok_or(Error::MissingProperty("X-TEMPLATE"))?;
        let lang = lang.ok_or(Error::MissingProperty("X-LANG"))?;

        // 无法解析开始时间的事件排在最后
        events.sort_by(|a, b| match (a.starts_at, b.starts_at) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });

        let mut previous_end: Option<NaiveDateTime> = None;
        for (index, event) in events.iter_mut().enumerate() {
            event.sequence = index + 1;
            if event.tag.is_empty() {
                event.tag = format!("event-{}", index + 1);
            }
            event.wait_minutes = previous_end
                .zip(event.starts_at)
                .map(|(end, start)| (start - end).num_minutes());
            previous_end = event.ends_at;
        }

        let days = events
            .iter()
            .find(|event| event.tag == CLIENT_INFO_TAG)
            .map(EventView::days)
            .unwrap_or_default();

        tracing::debug!("构建日历视图: {} 个事件", events.len());

        Ok(Self {
            name: calendar.text("X-WR-CALNAME").map(str::to_string),
            template,
            lang,
            events,
            days,
        })
    }

    /// 按标签查找事件
    pub fn event_by_tag(&self, tag: &str) -> Option<&EventView> {
        self.events.iter().find(|event| event.tag == tag)
    }
}

impl EventView {
    fn from_node(event: &IcalNode) -> Self {
        let (start_key, start) = find_prefixed(event, "DTSTART");
        let (end_key, end) = find_prefixed(event, "DTEND");

        let starts_at = start.and_then(parse_date_time);
        let ends_at = end.and_then(parse_date_time);
        let duration_minutes = starts_at
            .zip(ends_at)
            .map(|(start, end)| (end - start).num_minutes());

        let fields = event
            .text("DESCRIPTION")
            .map(|description| description_fields(&unescape_text(description)))
            .unwrap_or_default();

        Self {
            sequence: 0,
            tag: event
                .text("X-CARLTAG")
                .map(str::trim)
                .unwrap_or_default()
                .to_string(),
            summary: event.text("SUMMARY").map(str::to_string),
            url: event.text("URL").map(str::to_string),
            location: unescape_text(event.text("LOCATION").unwrap_or_default()),
            start_timezone: start_key.and_then(timezone_param),
            end_timezone: end_key.and_then(timezone_param),
            start_time: start.and_then(clock_time),
            end_time: end.and_then(clock_time),
            start: start.map(str::to_string),
            end: end.map(str::to_string),
            starts_at,
            ends_at,
            duration_minutes,
            wait_minutes: None,
            fields,
        }
    }

    /// 开始到结束之间的整天数对应的日期，不足一天的部分舍去
    fn days(&self) -> Vec<NaiveDate> {
        let Some((start, end)) = self.starts_at.zip(self.ends_at) else {
            return Vec::new();
        };
        let count = (end - start).num_days().max(0);
        (0..count)
            .filter_map(|offset| start.date().checked_add_days(Days::new(offset.unsigned_abs())))
            .collect()
    }
}

/// 查找第一个以指定名称开头的键，例如 `DTSTART;TZID=Europe/Lisbon`
fn find_prefixed<'a>(node: &'a IcalNode, name: &str) -> (Option<&'a str>, Option<&'a str>) {
    node.iter()
        .find(|(key, _)| key.split(';').next() == Some(name))
        .map_or((None, None), |(key, value)| (Some(key), value.as_text()))
}

fn timezone_param(key: &str) -> Option<String> {
    key.split(';')
        .find_map(|param| param.strip_prefix("TZID="))
        .map(str::to_string)
}

fn clock_time(value: &str) -> Option<String> {
    let (_, time) = value.split_once('T')?;
    let hours = time.get(0..2)?;
    let minutes = time.get(2..4)?;
    Some(format!("{hours}:{minutes}"))
}

/// 解析 `YYYYMMDDTHHMMSS`（可带 `Z`）或 `YYYYMMDD`
pub fn parse_date_time(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim_end_matches('Z');
    NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y%m%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// 提取描述中的 `键: 值` 行，键转换为首字母大写并去掉空格
fn description_fields(description: &str) -> BTreeMap<String, String> {
    description
        .lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (title_case_key(key.trim()), value.trim().to_string()))
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

fn title_case_key(key: &str) -> String {
    key.split(' ')
        .map(|word| {
            WORD.replace_all(word, |caps: &Captures| {
                let mut chars = caps[0].chars();
                chars.next().map_or_else(String::new, |first| {
                    first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
                })
            })
        })
        .collect()
}

/// 反转义ICS文本值
pub fn unescape_text(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut chars = text.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            output.push(ch);
            continue;
        }
        match chars.next() {
            Some('n' | 'N') => output.push('\n'),
            Some(escaped @ ('\\' | ',' | ';')) => output.push(escaped),
            Some(other) => {
                output.push('\\');
                output.push(other);
            }
            None => output.push('\\'),
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode;

    const AGENDA: &str = "BEGIN:VCALENDAR
X-WR-CALNAME:ACME Onboarding
BEGIN:VEVENT
DTSTART;TZID=America/Sao_Paulo:20240312T140000
DTEND;TZID=America/Sao_Paulo:20240312T160000
SUMMARY:Second day
LOCATION:Room 2\\, Building B
X-LANG:pt-br
END:VEVENT
BEGIN:VEVENT
DTSTART;TZID=America/Sao_Paulo:20240311T090000
DTEND;TZID=America/Sao_Paulo:20240311T103000
SUMMARY:Kick-off
DESCRIPTION:contact person: Ana Souza\\nmeeting room: 12:B\\nno separator here
X-CARLTAG: clientinfo
X-TEMPLATE:agenda
END:VEVENT
END:VCALENDAR";

    #[test]
    fn test_view_sorts_and_tags_events() {
        let view = CalendarView::from_node(&decode(AGENDA)).unwrap();

        assert_eq!(view.name.as_deref(), Some("ACME Onboarding"));
        assert_eq!(view.template, "agenda");
        assert_eq!(view.lang, "pt-br");

        let tags: Vec<&str> = view.events.iter().map(|e| e.tag.as_str()).collect();
        assert_eq!(tags, vec!["clientinfo", "event-2"]);
        assert_eq!(view.events[1].sequence, 2);
    }

    #[test]
    fn test_view_event_fields() {
        let view = CalendarView::from_node(&decode(AGENDA)).unwrap();
        let kickoff = view.event_by_tag("clientinfo").unwrap();

        assert_eq!(kickoff.start_timezone.as_deref(), Some("America/Sao_Paulo"));
        assert_eq!(kickoff.start_time.as_deref(), Some("09:00"));
        assert_eq!(kickoff.end_time.as_deref(), Some("10:30"));
        assert_eq!(kickoff.duration_minutes, Some(90));
        assert_eq!(kickoff.fields.get("ContactPerson").map(String::as_str), Some("Ana Souza"));
        assert_eq!(kickoff.fields.get("MeetingRoom").map(String::as_str), Some("12:B"));
        assert_eq!(kickoff.fields.len(), 2);

        let second = view.event_by_tag("event-2").unwrap();
        assert_eq!(second.location, "Room 2, Building B");
    }

    #[test]
    fn test_view_requires_template_and_lang() {
        let root = decode("BEGIN:VCALENDAR\nBEGIN:VEVENT\nX-LANG:en\nEND:VEVENT\nEND:VCALENDAR");
        assert!(matches!(
            CalendarView::from_node(&root),
            Err(Error::MissingProperty("X-TEMPLATE"))
        ));

        let root = decode("BEGIN:VCALENDAR\nEND:VCALENDAR");
        assert!(matches!(CalendarView::from_node(&root), Err(Error::NoEvents)));

        assert!(matches!(
            CalendarView::from_node(&IcalNode::new()),
            Err(Error::MissingCalendar)
        ));
    }

    #[test]
    fn test_view_ignores_empty_template_and_lang() {
        let root = decode(
            "BEGIN:VCALENDAR
BEGIN:VEVENT
X-TEMPLATE:agenda
X-LANG:en
END:VEVENT
BEGIN:VEVENT
X-TEMPLATE:
X-LANG:
END:VEVENT
END:VCALENDAR",
        );
        let view = CalendarView::from_node(&root).unwrap();
        assert_eq!(view.template, "agenda");
        assert_eq!(view.lang, "en");

        let root = decode("BEGIN:VCALENDAR\nBEGIN:VEVENT\nX-TEMPLATE:\nX-LANG:en\nEND:VEVENT\nEND:VCALENDAR");
        assert!(matches!(
            CalendarView::from_node(&root),
            Err(Error::MissingProperty("X-TEMPLATE"))
        ));
    }

    #[test]
    fn test_view_wait_between_events() {
        let view = CalendarView::from_node(&decode(AGENDA)).unwrap();
        assert_eq!(view.events[0].wait_minutes, None);
        // 11日10:30结束，12日14:00开始
        assert_eq!(view.events[1].wait_minutes, Some(27 * 60 + 30));
    }

    #[test]
    fn test_view_days_from_clientinfo() {
        let root = decode(
            "BEGIN:VCALENDAR
BEGIN:VEVENT
X-CARLTAG:clientinfo
X-TEMPLATE:agenda
X-LANG:en
DTSTART:20240311T090000
DTEND:20240314T120000
END:VEVENT
END:VCALENDAR",
        );
        let view = CalendarView::from_node(&root).unwrap();
        let days: Vec<String> = view.days.iter().map(|d| d.format("%Y-%m-%d").to_string()).collect();
        assert_eq!(days, vec!["2024-03-11", "2024-03-12", "2024-03-13"]);

        // 单日事件不足一天
        let agenda = CalendarView::from_node(&decode(AGENDA)).unwrap();
        assert!(agenda.days.is_empty());
    }

    #[test]
    fn test_parse_date_time_forms() {
        assert!(parse_date_time("20240311T090000Z").is_some());
        assert_eq!(
            parse_date_time("20240311"),
            NaiveDate::from_ymd_opt(2024, 3, 11).and_then(|d| d.and_hms_opt(0, 0, 0))
        );
        assert!(parse_date_time("soon").is_none());
    }

    #[test]
    fn test_unescape_text() {
        assert_eq!(unescape_text(r"a\, b\; c\\d\ne"), "a, b; c\\d\ne");
        assert_eq!(unescape_text(r"keep\x"), r"keep\x");
    }
}

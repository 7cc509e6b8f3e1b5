//! Arrow schemas for every dayroll view and the row <-> record batch
//! conversions shared by the CSV and Parquet codecs.
//!
//! These schemas are the export contract: column names and types must stay
//! stable so that files written by one build read back in another.

use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, BooleanArray, Date32Array, Int64Array, StringArray, UInt32Array,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use dayroll_core::{
    ActionKey, ActionMeta, ConsistentRecord, DailyRecord, DowntimeInterval, LatestRecord, Status,
    TransitionEvent,
};
use time::Date;

use crate::error::{InterchangeError, Result};

/// A row type with a fixed columnar layout.
pub trait TableRow: Sized {
    fn schema() -> SchemaRef;

    fn to_batch(rows: &[Self]) -> Result<RecordBatch>;

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>>;
}

// ──────────────────────────────────────────────
// Scalar conversions
// ──────────────────────────────────────────────

/// Julian day number of 1970-01-01, the Date32 origin.
const UNIX_EPOCH_JULIAN_DAY: i32 = 2_440_588;

pub(crate) fn to_date32(day: Date) -> i32 {
    day.to_julian_day() - UNIX_EPOCH_JULIAN_DAY
}

pub(crate) fn from_date32(value: i32) -> std::result::Result<Date, String> {
    let julian = value
        .checked_add(UNIX_EPOCH_JULIAN_DAY)
        .ok_or_else(|| format!("day {} is out of range", value))?;
    Date::from_julian_day(julian).map_err(|e| e.to_string())
}

// ──────────────────────────────────────────────
// Column access
// ──────────────────────────────────────────────

fn column<'a, A: Array + 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a A> {
    batch
        .column_by_name(name)
        .ok_or_else(|| InterchangeError::Schema {
            column: name.to_string(),
            message: "missing column".to_string(),
        })?
        .as_any()
        .downcast_ref::<A>()
        .ok_or_else(|| InterchangeError::Schema {
            column: name.to_string(),
            message: "unexpected column type".to_string(),
        })
}

fn invalid(row: usize, column: &str, message: impl Into<String>) -> InterchangeError {
    InterchangeError::InvalidValue {
        row,
        column: column.to_string(),
        message: message.into(),
    }
}

/// Typed read access to one batch, reporting nulls in required columns.
struct Reader<'a> {
    batch: &'a RecordBatch,
}

impl<'a> Reader<'a> {
    fn new(batch: &'a RecordBatch) -> Self {
        Reader { batch }
    }

    fn rows(&self) -> usize {
        self.batch.num_rows()
    }

    fn string(&self, name: &'a str) -> Result<StringColumn<'a>> {
        Ok(StringColumn {
            name,
            array: column::<StringArray>(self.batch, name)?,
        })
    }

    fn date(&self, name: &'a str) -> Result<DateColumn<'a>> {
        Ok(DateColumn {
            name,
            array: column::<Date32Array>(self.batch, name)?,
        })
    }

    fn boolean(&self, name: &'a str) -> Result<&'a BooleanArray> {
        column::<BooleanArray>(self.batch, name)
    }

    fn meta(&self) -> Result<MetaColumns<'a>> {
        Ok(MetaColumns {
            metier: self.string("metier")?,
            zone: self.string("zone")?,
            platform: self.string("platform")?,
            well: self.string("well")?,
            tag: self.string("tag")?,
            sub_equipment: self.string("sub_equipment")?,
            free_text: self.string("free_text")?,
            unavailable: self.boolean("unavailable")?,
            sheet: self.string("sheet")?,
        })
    }
}

struct StringColumn<'a> {
    name: &'a str,
    array: &'a StringArray,
}

impl StringColumn<'_> {
    fn optional(&self, row: usize) -> Option<String> {
        (!self.array.is_null(row)).then(|| self.array.value(row).to_string())
    }

    fn required(&self, row: usize) -> Result<String> {
        self.optional(row)
            .ok_or_else(|| invalid(row, self.name, "null in required column"))
    }

    fn key(&self, row: usize) -> Result<ActionKey> {
        self.required(row).map(ActionKey::new)
    }

    fn status(&self, row: usize) -> Result<Status> {
        let raw = self.required(row)?;
        raw.parse::<Status>()
            .map_err(|e| invalid(row, self.name, e.to_string()))
    }
}

struct DateColumn<'a> {
    name: &'a str,
    array: &'a Date32Array,
}

impl DateColumn<'_> {
    fn get(&self, row: usize) -> Result<Date> {
        if self.array.is_null(row) {
            return Err(invalid(row, self.name, "null in required column"));
        }
        from_date32(self.array.value(row)).map_err(|e| invalid(row, self.name, e))
    }
}

struct MetaColumns<'a> {
    metier: StringColumn<'a>,
    zone: StringColumn<'a>,
    platform: StringColumn<'a>,
    well: StringColumn<'a>,
    tag: StringColumn<'a>,
    sub_equipment: StringColumn<'a>,
    free_text: StringColumn<'a>,
    unavailable: &'a BooleanArray,
    sheet: StringColumn<'a>,
}

impl MetaColumns<'_> {
    fn get(&self, row: usize) -> ActionMeta {
        ActionMeta {
            metier: self.metier.optional(row),
            zone: self.zone.optional(row),
            platform: self.platform.optional(row),
            well: self.well.optional(row),
            tag: self.tag.optional(row),
            sub_equipment: self.sub_equipment.optional(row),
            free_text: self.free_text.optional(row),
            unavailable: !self.unavailable.is_null(row) && self.unavailable.value(row),
            sheet: self.sheet.optional(row),
        }
    }
}

// ──────────────────────────────────────────────
// Column builders
// ──────────────────────────────────────────────

fn meta_fields() -> Vec<Field> {
    vec![
        Field::new("metier", DataType::Utf8, true),
        Field::new("zone", DataType::Utf8, true),
        Field::new("platform", DataType::Utf8, true),
        Field::new("well", DataType::Utf8, true),
        Field::new("tag", DataType::Utf8, true),
        Field::new("sub_equipment", DataType::Utf8, true),
        Field::new("free_text", DataType::Utf8, true),
        Field::new("unavailable", DataType::Boolean, false),
        Field::new("sheet", DataType::Utf8, true),
    ]
}

fn strings<'a, T: 'a>(rows: &'a [T], f: impl Fn(&'a T) -> Option<&'a str>) -> ArrayRef {
    Arc::new(StringArray::from(rows.iter().map(f).collect::<Vec<_>>()))
}

fn dates<T>(rows: &[T], f: impl Fn(&T) -> Date) -> ArrayRef {
    Arc::new(Date32Array::from(
        rows.iter().map(|r| to_date32(f(r))).collect::<Vec<_>>(),
    ))
}

fn bools<'a, T: 'a>(rows: &'a [T], f: impl Fn(&'a T) -> bool) -> ArrayRef {
    Arc::new(BooleanArray::from(rows.iter().map(f).collect::<Vec<_>>()))
}

fn meta_columns<'a, T: 'a>(
    rows: &'a [T],
    meta: impl Fn(&'a T) -> &'a ActionMeta + Copy,
) -> Vec<ArrayRef> {
    vec![
        strings(rows, move |r| meta(r).metier.as_deref()),
        strings(rows, move |r| meta(r).zone.as_deref()),
        strings(rows, move |r| meta(r).platform.as_deref()),
        strings(rows, move |r| meta(r).well.as_deref()),
        strings(rows, move |r| meta(r).tag.as_deref()),
        strings(rows, move |r| meta(r).sub_equipment.as_deref()),
        strings(rows, move |r| meta(r).free_text.as_deref()),
        bools(rows, |r| meta(r).unavailable),
        strings(rows, move |r| meta(r).sheet.as_deref()),
    ]
}

fn schema_with_meta(leading: Vec<Field>, trailing: Vec<Field>) -> SchemaRef {
    let mut fields = leading;
    fields.extend(meta_fields());
    fields.extend(trailing);
    Arc::new(Schema::new(fields))
}

fn batch(schema: SchemaRef, columns: Vec<ArrayRef>) -> Result<RecordBatch> {
    Ok(RecordBatch::try_new(schema, columns)?)
}

// ──────────────────────────────────────────────
// Row types
// ──────────────────────────────────────────────

impl TableRow for DailyRecord {
    fn schema() -> SchemaRef {
        schema_with_meta(
            vec![
                Field::new("action_key", DataType::Utf8, false),
                Field::new("day", DataType::Date32, false),
                Field::new("status", DataType::Utf8, false),
            ],
            vec![],
        )
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        let mut columns = vec![
            strings(rows, |r| Some(r.action_key.as_str())),
            dates(rows, |r| r.day),
            strings(rows, |r| Some(r.status.as_str())),
        ];
        columns.extend(meta_columns(rows, |r| &r.meta));
        batch(Self::schema(), columns)
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let rd = Reader::new(batch);
        let (key, day, status) = (rd.string("action_key")?, rd.date("day")?, rd.string("status")?);
        let meta = rd.meta()?;
        (0..rd.rows())
            .map(|i| {
                Ok(DailyRecord {
                    action_key: key.key(i)?,
                    day: day.get(i)?,
                    status: status.status(i)?,
                    meta: meta.get(i),
                })
            })
            .collect()
    }
}

impl TableRow for ConsistentRecord {
    fn schema() -> SchemaRef {
        schema_with_meta(
            vec![
                Field::new("action_key", DataType::Utf8, false),
                Field::new("day", DataType::Date32, false),
                Field::new("status", DataType::Utf8, false),
                Field::new("filled", DataType::Boolean, false),
                Field::new("reopened", DataType::Boolean, false),
            ],
            vec![],
        )
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        let mut columns = vec![
            strings(rows, |r| Some(r.action_key.as_str())),
            dates(rows, |r| r.day),
            strings(rows, |r| Some(r.status.as_str())),
            bools(rows, |r| r.filled),
            bools(rows, |r| r.reopened),
        ];
        columns.extend(meta_columns(rows, |r| &r.meta));
        batch(Self::schema(), columns)
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let rd = Reader::new(batch);
        let (key, day, status) = (rd.string("action_key")?, rd.date("day")?, rd.string("status")?);
        let (filled, reopened) = (rd.boolean("filled")?, rd.boolean("reopened")?);
        let meta = rd.meta()?;
        (0..rd.rows())
            .map(|i| {
                Ok(ConsistentRecord {
                    action_key: key.key(i)?,
                    day: day.get(i)?,
                    status: status.status(i)?,
                    filled: filled.value(i),
                    reopened: reopened.value(i),
                    meta: meta.get(i),
                })
            })
            .collect()
    }
}

impl TableRow for LatestRecord {
    fn schema() -> SchemaRef {
        schema_with_meta(
            vec![
                Field::new("action_key", DataType::Utf8, false),
                Field::new("first_day", DataType::Date32, false),
                Field::new("last_day", DataType::Date32, false),
                Field::new("status", DataType::Utf8, false),
            ],
            vec![],
        )
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        let mut columns = vec![
            strings(rows, |r| Some(r.action_key.as_str())),
            dates(rows, |r| r.first_day),
            dates(rows, |r| r.last_day),
            strings(rows, |r| Some(r.status.as_str())),
        ];
        columns.extend(meta_columns(rows, |r| &r.meta));
        batch(Self::schema(), columns)
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let rd = Reader::new(batch);
        let key = rd.string("action_key")?;
        let (first, last) = (rd.date("first_day")?, rd.date("last_day")?);
        let status = rd.string("status")?;
        let meta = rd.meta()?;
        (0..rd.rows())
            .map(|i| {
                Ok(LatestRecord {
                    action_key: key.key(i)?,
                    first_day: first.get(i)?,
                    last_day: last.get(i)?,
                    status: status.status(i)?,
                    meta: meta.get(i),
                })
            })
            .collect()
    }
}

impl TableRow for TransitionEvent {
    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("action_key", DataType::Utf8, false),
            Field::new("day", DataType::Date32, false),
            Field::new("from_status", DataType::Utf8, false),
            Field::new("to_status", DataType::Utf8, false),
        ]))
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        batch(
            Self::schema(),
            vec![
                strings(rows, |r| Some(r.action_key.as_str())),
                dates(rows, |r| r.day),
                strings(rows, |r| Some(r.from_status.as_str())),
                strings(rows, |r| Some(r.to_status.as_str())),
            ],
        )
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let rd = Reader::new(batch);
        let (key, day) = (rd.string("action_key")?, rd.date("day")?);
        let (from, to) = (rd.string("from_status")?, rd.string("to_status")?);
        (0..rd.rows())
            .map(|i| {
                Ok(TransitionEvent {
                    action_key: key.key(i)?,
                    day: day.get(i)?,
                    from_status: from.status(i)?,
                    to_status: to.status(i)?,
                })
            })
            .collect()
    }
}

impl TableRow for DowntimeInterval {
    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("tag", DataType::Utf8, false),
            Field::new("start_day", DataType::Date32, false),
            Field::new("end_day", DataType::Date32, false),
            Field::new("duration_days", DataType::Int64, false),
            Field::new("action_count", DataType::UInt32, false),
        ]))
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        batch(
            Self::schema(),
            vec![
                strings(rows, |r| Some(r.tag.as_str())),
                dates(rows, |r| r.start_day),
                dates(rows, |r| r.end_day),
                Arc::new(Int64Array::from(
                    rows.iter().map(|r| r.duration_days).collect::<Vec<_>>(),
                )),
                Arc::new(UInt32Array::from(
                    rows.iter().map(|r| r.action_count).collect::<Vec<_>>(),
                )),
            ],
        )
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let rd = Reader::new(batch);
        let tag = rd.string("tag")?;
        let (start, end) = (rd.date("start_day")?, rd.date("end_day")?);
        let duration = column::<Int64Array>(batch, "duration_days")?;
        let actions = column::<UInt32Array>(batch, "action_count")?;
        (0..rd.rows())
            .map(|i| {
                Ok(DowntimeInterval {
                    tag: tag.required(i)?,
                    start_day: start.get(i)?,
                    end_day: end.get(i)?,
                    duration_days: duration.value(i),
                    action_count: actions.value(i),
                })
            })
            .collect()
    }
}

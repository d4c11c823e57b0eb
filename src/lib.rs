/*!
# Rental Admin Reporting

Reporting core of the e-bike rental operator's admin console: the row ordering
and file export that back the Rentals, Returns, Battery Swaps and Analytics
tables.

## Overview

The admin console is a thin client over the rental backend's REST API. Rows
arrive as loosely typed JSON; the same field may be a number on one row, a
numeric string on the next and missing entirely on a third. This crate turns
those rows into typed cells and gives every table the same behaviour:

- clicking a header sorts the table, a second click reverses it
- empty cells always sink to the bottom, whichever way the column is sorted
- "Export CSV" writes the rows exactly in the order they are displayed

## Architecture

### Core (always built)
- **cell**: `CellValue` (null, bool, number, text, instant) and insertion-ordered `Record`
- **sorter**: value classification, comparison, stable `sort_rows`, `toggle_sort`
- **downloader**: CSV escaping, `to_csv`, `download_csv` (and XLSX with `web`)
- **loader**: records from REST collection responses or JSON snapshots
- **tables**: column layouts of the admin report pages, rupee formatting
- **config**: environment/argument settings and logger setup

### Web layer (`web` feature)
- **app**: axum routes that sort rows and return exports as attachments

## REST API Endpoints

- `GET  /health` - Liveness probe
- `POST /api/sort` - Sort posted rows by a sort state
- `POST /api/sort/toggle` - Next sort state after a header click
- `POST /api/export` - CSV attachment from posted columns and rows
- `POST /api/export.xlsx` - XLSX attachment from posted columns and rows
- `GET  /api/reports/{table}/columns` - Column layout of a report table
- `POST /api/reports/{table}/export` - CSV attachment using the table's layout
*/

pub mod app;
pub mod cell;
pub mod config;
pub mod downloader;
pub mod loader;
pub mod sorter;
pub mod tables;

/// Re-export the everyday types and functions
pub use cell::{CellValue, Record, Row};
pub use downloader::{Column, Download, download_csv, escape_csv_cell, to_csv};
pub use sorter::{
    SortDirection, SortOptions, SortState, compare_values, sort_by_state, sort_rows, toggle_sort,
};
pub use tables::{ReportTable, export_report, format_inr};

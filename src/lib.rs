/*!
# UK Visa Statistics Dashboard

Turns a multi-sheet immigration statistics workbook into a page of charts,
served over HTTP or written as a static HTML report.

## Overview

A workbook is uploaded once per session and kept in memory. Every request
re-runs the pipeline for the selected sheet: the wide year columns are
melted into long rows, grouped and summed, and each chart whose sheets and
columns are present is drawn as inline SVG.

## Architecture

### Data Layer
- **loader**: `.xlsx`/`.xlsm`/`.xls`/`.ods` through calamine, `.csv` through
  the csv crate, into a [`table::Workbook`]
- **table**: ordered sheets of text, numeric and missing cells
- **reshape**: year-column detection and the wide-to-long melt, with an
  explicit [`reshape::NullPolicy`]
- **aggregate**: group-and-sum, top-N and the long-to-wide pivot
- **geo**: demonym to country to ISO 3166 alpha-3 lookup through keshvar
- **world**: embedded Natural Earth country outlines (GeoJSON)

### Chart Layer
- **charts**: which of the six charts a workbook supports, and their datasets
- **graph**: plotters rendering to SVG
- **dashboard**: preview, charts and per-chart notices for one sheet
- **report**: handlebars pages (interactive and static)
- **downloader**: long-format export as CSV or XLSX

### Web Layer (feature `web`)
- **app**: axum routes, multipart upload and cookie sessions

## Charts

1. Visa type trends over time (stacked area)
2. Status to visa flow
3. Top nationalities of students
4. Geographic spread of students
5. Study vs dependant nationality differences (dumbbell)
6. Dependant visa trends over time

## REST API Endpoints

- `/` - Upload page, or the dashboard for `?sheet=`
- `/upload` - Multipart upload of the workbook
- `/api/charts` - Sheets and renderable chart kinds as JSON
- `/export` - Long-format download, `?sheet=&format=csv|xlsx`
*/

pub mod aggregate;
pub mod charts;
pub mod config;
pub mod dashboard;
pub mod downloader;
pub mod error;
pub mod geo;
pub mod graph;
pub mod loader;
pub mod report;
pub mod reshape;
pub mod table;
pub mod world;

#[cfg(feature = "web")]
pub mod app;

pub use config::DashboardConfig;
pub use error::{DashboardError, Result};
pub use table::{Table, Value, Workbook};

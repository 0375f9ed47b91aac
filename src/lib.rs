/*!
# Cartesian Plot

A client for a named-row / named-column numeric table and the cartesian plots
drawn from it.

## Overview

The table has "dimensions" as columns and "data points" as rows. Each row has
one numeric attribute per dimension plus a free-text annotation. A plot binds
its four semi-axes (xPositive, xNegative, yPositive, yNegative) to four
dimensions. Each row is drawn at

```text
x = attributes[xPositive] - attributes[xNegative]
y = attributes[yPositive] - attributes[yNegative]
```

so every displayed axis contrasts two opposing measures (e.g. "praise" against
"criticism").

The backend REST API owns all persistent state. This crate keeps read-mostly
caches of the table and the plot list and re-fetches them wholesale after every
mutation.

## Architecture

### Core
- **projector**: Row to point projection and the valid/invalid partition
- **domain**: Symmetric, padded axis ranges
- **edit**: The single open editor (cell, annotation, row name or plot preview)
- **debounce**: Keyed accumulator with a single-shot deadline
- **table_store** / **axis_store**: Backend-synchronised caches
- **workbench**: One session tying the caches, the editor and the token together

### Collaborators
- **api**: The `TableApi` trait, one method per backend endpoint
- **http**: `TableApi` over HTTP with bearer token and read retry
- **auth**: Token file (the only state kept between runs)
- **config**: `CARTESIAN_*` environment settings

### Output
- **graph**: SVG and PNG rendering with plotters
- **saving**: Dated snapshot files, optionally gzip-compressed
- **downloader**: CSV and XLSX export
- **app**: Browser viewer (feature `web`)

## Front ends

- `cli`: interactive line client for editing the table and plots
- `viewer`: local web server showing the plots, with inline debounced slot changes

## Backend endpoints

- `GET /table`, `POST /column`, `POST /row`, `PUT /row/{name}/name`
- `PUT /cell`, `PUT /annotation`, `DELETE /column/{name}`, `DELETE /row/{name}`
- `GET /export`, `POST /import`
- `GET|POST /axis-settings`, `PUT|DELETE /axis-settings/{id}`
*/

pub mod api;
pub mod auth;
pub mod axis_store;
pub mod config;
pub mod debounce;
pub mod domain;
pub mod downloader;
pub mod edit;
pub mod error;
pub mod graph;
pub mod http;
pub mod logging;
pub mod model;
pub mod projector;
pub mod saving;
pub mod table_store;
pub mod workbench;

#[cfg(feature = "web")]
pub mod app;

/// Re-export the types most callers need
pub use api::TableApi;
pub use auth::TokenStore;
pub use axis_store::{AxisConfigStore, AxisDraft, Selection};
pub use config::Config;
pub use domain::PlotDomain;
pub use edit::{Commit, Confirm, EditKey, EditSession, Editor, Mutation, TableEdit};
pub use error::{Error, Result};
pub use http::HttpApi;
pub use model::*;
pub use projector::{PlotView, Projection, project, project_point};
pub use table_store::{FetchStatus, TableStore};
pub use workbench::Workbench;

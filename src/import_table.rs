//! Auto-import table
//!
//! Static data: which identifiers each supported library binds and the import
//! lines that bind them. The semantic analyzer consults it for names that are
//! not bound anywhere else; the parser uses [`library`] to give
//! `use the pandas library` its conventional alias. The generator never looks
//! at it.
//!
//! Lookup priority:
//! 1. A name an entry's import lines bind (`pd`, `datetime`, `Flask`)
//! 2. The library name itself, or one of its aliases
//!
//! Entries are scanned in registration order and the first hit wins, so when
//! two libraries bind the same name the earlier entry decides.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// One supported library
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LibraryEntry {
    /// Library name as a Plain program refers to it
    pub name: &'static str,
    /// Other words that mean this library
    pub aliases: &'static [&'static str],
    /// Identifier the library module is bound to, when imported under an alias
    pub binding: Option<&'static str>,
    /// Names bound by `imports`
    pub provides: &'static [&'static str],
    /// Canonical import lines, in output order
    pub imports: &'static [&'static str],
}

/// How an unbound name is satisfied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub library: &'static str,
    /// Identifier the generated code must use (`pandas` becomes `pd`)
    pub bound_name: String,
    pub imports: Vec<String>,
}

const fn module(name: &'static str, imports: &'static [&'static str]) -> LibraryEntry {
    LibraryEntry {
        name,
        aliases: &[],
        binding: None,
        provides: &[],
        imports,
    }
}

pub const LIBRARIES: &[LibraryEntry] = &[
    // Standard library
    module("json", &["import json"]),
    module("os", &["import os"]),
    module("sys", &["import sys"]),
    LibraryEntry {
        provides: &["datetime", "timedelta"],
        ..module("datetime", &["from datetime import datetime, timedelta"])
    },
    module("time", &["import time"]),
    module("csv", &["import csv"]),
    module("re", &["import re"]),
    module("logging", &["import logging"]),
    LibraryEntry {
        provides: &["Path"],
        ..module("pathlib", &["from pathlib import Path"])
    },
    LibraryEntry {
        provides: &["defaultdict", "Counter", "deque"],
        ..module("collections", &["from collections import defaultdict, Counter, deque"])
    },
    LibraryEntry {
        provides: &["chain", "combinations", "permutations"],
        ..module("itertools", &["from itertools import chain, combinations, permutations"])
    },
    LibraryEntry {
        provides: &["wraps", "lru_cache"],
        ..module("functools", &["from functools import wraps, lru_cache"])
    },
    module("asyncio", &["import asyncio"]),
    module("threading", &["import threading"]),
    module("multiprocessing", &["import multiprocessing"]),
    module("sqlite3", &["import sqlite3"]),
    module("urllib", &["import urllib"]),
    module("http", &["import http"]),
    module("email", &["import email"]),
    module("hashlib", &["import hashlib"]),
    module("base64", &["import base64"]),
    module("uuid", &["import uuid"]),
    module("random", &["import random"]),
    module("math", &["import math"]),
    module("statistics", &["import statistics"]),
    // Web frameworks
    LibraryEntry {
        provides: &[
            "Flask",
            "request",
            "jsonify",
            "render_template",
            "send_file",
            "send_from_directory",
        ],
        ..module(
            "flask",
            &["from flask import Flask, request, jsonify, render_template, send_file, send_from_directory"],
        )
    },
    LibraryEntry {
        provides: &["HttpResponse", "JsonResponse"],
        ..module("django", &["from django.http import HttpResponse, JsonResponse"])
    },
    LibraryEntry {
        provides: &["FastAPI", "HTTPException"],
        ..module("fastapi", &["from fastapi import FastAPI, HTTPException"])
    },
    module("tornado", &["import tornado.web"]),
    module("aiohttp", &["import aiohttp"]),
    // HTTP clients
    module("requests", &["import requests"]),
    module("httpx", &["import httpx"]),
    module("urllib3", &["import urllib3"]),
    // Databases
    LibraryEntry {
        provides: &[
            "create_engine",
            "Column",
            "Integer",
            "String",
            "ForeignKey",
            "declarative_base",
            "sessionmaker",
        ],
        ..module(
            "sqlalchemy",
            &[
                "from sqlalchemy import create_engine, Column, Integer, String, ForeignKey",
                "from sqlalchemy.ext.declarative import declarative_base",
                "from sqlalchemy.orm import sessionmaker",
            ],
        )
    },
    module("psycopg2", &["import psycopg2"]),
    LibraryEntry {
        provides: &["MongoClient"],
        ..module("pymongo", &["from pymongo import MongoClient"])
    },
    module("redis", &["import redis"]),
    module("pymysql", &["import pymysql"]),
    // Data science
    LibraryEntry {
        aliases: &["pd"],
        binding: Some("pd"),
        provides: &["pd"],
        ..module("pandas", &["import pandas as pd"])
    },
    LibraryEntry {
        aliases: &["np"],
        binding: Some("np"),
        provides: &["np"],
        ..module("numpy", &["import numpy as np"])
    },
    module("matplotlib", &["import matplotlib.pyplot"]),
    LibraryEntry {
        binding: Some("plt"),
        provides: &["plt"],
        ..module("pyplot", &["import matplotlib.pyplot as plt"])
    },
    LibraryEntry {
        aliases: &["sns"],
        binding: Some("sns"),
        provides: &["sns"],
        ..module("seaborn", &["import seaborn as sns"])
    },
    module("scipy", &["import scipy"]),
    module("sklearn", &["import sklearn"]),
    // Testing
    module("unittest", &["import unittest"]),
    module("pytest", &["import pytest"]),
    LibraryEntry {
        provides: &["Mock", "patch"],
        ..module("mock", &["from unittest.mock import Mock, patch"])
    },
    // Tooling and configuration
    module("click", &["import click"]),
    LibraryEntry {
        provides: &["List", "Dict", "Optional", "Union", "Any", "Tuple", "Callable"],
        ..module(
            "typing",
            &["from typing import List, Dict, Optional, Union, Any, Tuple, Callable"],
        )
    },
    LibraryEntry {
        provides: &["dataclass", "field"],
        ..module("dataclasses", &["from dataclasses import dataclass, field"])
    },
    LibraryEntry {
        provides: &["Enum"],
        ..module("enum", &["from enum import Enum"])
    },
    module("pydantic", &["import pydantic"]),
    module("configparser", &["import configparser"]),
    module("yaml", &["import yaml"]),
    module("toml", &["import toml"]),
    LibraryEntry {
        provides: &["load_dotenv"],
        ..module("dotenv", &["from dotenv import load_dotenv"])
    },
];

/// Library name -> entry
static BY_NAME: Lazy<HashMap<&'static str, &'static LibraryEntry>> =
    Lazy::new(|| LIBRARIES.iter().map(|entry| (entry.name, entry)).collect());

impl LibraryEntry {
    /// Whether the import lines bind `name`
    pub fn binds(&self, name: &str) -> bool {
        if self.provides.contains(&name) {
            return true;
        }
        // `import X` and `import X.y` bind X
        self.imports.iter().any(|line| {
            line.strip_prefix("import ")
                .filter(|rest| !rest.contains(" as "))
                .and_then(|rest| rest.split('.').next())
                == Some(name)
        })
    }

    /// `(module, alias)` when the entry imports its module under an alias
    pub fn aliased_import(&self) -> Option<(&'static str, &'static str)> {
        let binding = self.binding?;
        self.imports.iter().find_map(|&line| {
            let (module, alias) = line.strip_prefix("import ")?.split_once(" as ")?;
            (alias == binding).then_some((module, alias))
        })
    }

    fn resolve(&self, name: &str) -> Option<Resolution> {
        let lines = |imports: &[&str]| imports.iter().map(|l| l.to_string()).collect();

        if self.binds(name) {
            return Some(Resolution {
                library: self.name,
                bound_name: name.to_string(),
                imports: lines(self.imports),
            });
        }
        if self.name != name && !self.aliases.contains(&name) {
            return None;
        }
        let resolution = match self.binding {
            Some(binding) => Resolution {
                library: self.name,
                bound_name: binding.to_string(),
                imports: lines(self.imports),
            },
            None => Resolution {
                library: self.name,
                bound_name: self.name.to_string(),
                imports: vec![format!("import {}", self.name)],
            },
        };
        Some(resolution)
    }
}

/// Resolve an unbound identifier against the built-in table
pub fn lookup(name: &str) -> Option<Resolution> {
    lookup_in(LIBRARIES, name)
}

/// Resolve against a specific table; the first matching entry wins
pub fn lookup_in(entries: &[LibraryEntry], name: &str) -> Option<Resolution> {
    entries.iter().find_map(|entry| entry.resolve(name))
}

/// Entry for a library name, ignoring aliases and provided names
pub fn library(name: &str) -> Option<&'static LibraryEntry> {
    BY_NAME.get(name).copied()
}

/// Import lines in first-required order, each line at most once
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequiredImports {
    lines: Vec<String>,
}

impl RequiredImports {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record lines, returning how many were new
    pub fn require<I, S>(&mut self, lines: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut added = 0;
        for line in lines {
            let line = line.into();
            if !self.lines.contains(&line) {
                self.lines.push(line);
                added += 1;
            }
        }
        added
    }

    pub fn contains(&self, line: &str) -> bool {
        self.lines.iter().any(|l| l == line)
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Lines present here but not in `earlier`
    pub fn since(&self, earlier: &RequiredImports) -> Vec<String> {
        self.lines
            .iter()
            .filter(|line| !earlier.contains(line))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_table_covers_fifty_libraries() {
        assert!(LIBRARIES.len() >= 50);
        let mut names: Vec<_> = LIBRARIES.iter().map(|e| e.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), LIBRARIES.len());
    }

    #[test]
    fn test_plain_module_binds_its_name() {
        let res = lookup("json").unwrap();
        assert_eq!(res.bound_name, "json");
        assert_eq!(res.imports, vec!["import json".to_string()]);

        let res = lookup("tornado").unwrap();
        assert_eq!(res.imports, vec!["import tornado.web".to_string()]);
    }

    #[test]
    fn test_module_name_is_renamed_to_binding() {
        let res = lookup("pandas").unwrap();
        assert_eq!(res.bound_name, "pd");
        assert_eq!(res.imports, vec!["import pandas as pd".to_string()]);
        assert_eq!(lookup("pd").unwrap().bound_name, "pd");
    }

    #[test]
    fn test_provided_names() {
        let res = lookup("Flask").unwrap();
        assert_eq!(res.library, "flask");
        assert_eq!(res.bound_name, "Flask");

        let res = lookup("declarative_base").unwrap();
        assert_eq!(res.imports.len(), 3);

        assert_eq!(lookup("timedelta").unwrap().library, "datetime");
        assert_eq!(lookup("Optional").unwrap().library, "typing");
    }

    #[test]
    fn test_from_style_library_name_falls_back_to_module_import() {
        let res = lookup("flask").unwrap();
        assert_eq!(res.bound_name, "flask");
        assert_eq!(res.imports, vec!["import flask".to_string()]);
    }

    #[test]
    fn test_unknown_name() {
        assert_eq!(lookup("frobnicate"), None);
        assert_eq!(lookup("Json"), None);
    }

    #[test]
    fn test_first_registered_entry_wins() {
        let entries = [
            LibraryEntry {
                provides: &["Widget"],
                ..module("first", &["from first import Widget"])
            },
            LibraryEntry {
                provides: &["Widget"],
                ..module("second", &["from second import Widget"])
            },
        ];
        assert_eq!(lookup_in(&entries, "Widget").unwrap().library, "first");
    }

    #[test]
    fn test_library_lookup_by_name() {
        assert_eq!(library("numpy").map(|e| e.binding), Some(Some("np")));
        assert!(library("np").is_none());
    }

    #[test]
    fn test_pyplot_binds_plt() {
        let res = lookup("pyplot").unwrap();
        assert_eq!(res.bound_name, "plt");
        assert_eq!(res.imports, vec!["import matplotlib.pyplot as plt".to_string()]);
        assert_eq!(lookup("plt").unwrap().library, "pyplot");

        let res = lookup("matplotlib").unwrap();
        assert_eq!(res.bound_name, "matplotlib");
        assert_eq!(res.imports, vec!["import matplotlib.pyplot".to_string()]);
    }

    #[test]
    fn test_aliased_import() {
        let aliased = |name: &str| library(name).and_then(LibraryEntry::aliased_import);
        assert_eq!(aliased("pandas"), Some(("pandas", "pd")));
        assert_eq!(aliased("pyplot"), Some(("matplotlib.pyplot", "plt")));
        assert_eq!(aliased("json"), None);
    }

    #[test]
    fn test_required_imports_dedup_in_order() {
        let mut required = RequiredImports::new();
        assert_eq!(required.require(["import os", "import sys"]), 2);
        assert_eq!(required.require(["import os"]), 0);
        let earlier = required.clone();
        required.require(vec!["import re".to_string()]);
        assert_eq!(required.lines(), &["import os", "import sys", "import re"]);
        assert_eq!(required.since(&earlier), vec!["import re".to_string()]);
    }
}

//! CSV 行の読み込みと正規化

use chrono::NaiveDate;
use csv::StringRecord;
use thiserror::Error;

use crate::ImportError;

const NAME_COLUMNS: &[&str] = &["nome", "nomecivil"];
const BIRTH_DATE_COLUMNS: &[&str] = &["datanascimento"];
const EMAIL_COLUMNS: &[&str] = &["email"];
const TELEPHONE_COLUMNS: &[&str] = &["telefone_1", "telefone_2", "telefone_3", "telefone_4"];
const CPF_COLUMNS: &[&str] = &["cpf"];

/// 正規化済みの顧客行
///
/// 値の形式は整えてあるが、ドメインの検証（氏名の長さ、メールアドレスの形式など）は
/// 登録時に行う。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerRecord {
    /// CSV 上の行番号（ヘッダーを 1 行目とする）
    pub line:       u64,
    pub full_name:  String,
    pub birth_date: NaiveDate,
    pub email:      String,
    pub telephone:  Option<String>,
    pub cpf:        String,
}

/// 行を取り込めない理由
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowRejection {
    #[error("{0} がありません")]
    MissingField(&'static str),

    #[error("生年月日を解釈できません: {0}")]
    InvalidBirthDate(String),

    #[error("CPF の形式が不正です")]
    InvalidCpf,
}

/// 読み込んだ 1 行の結果
pub type RowResult = (u64, Result<CustomerRecord, RowRejection>);

/// Latin-1 のバイト列を文字列に変換する
///
/// Latin-1 の各バイトは同じ値の Unicode スカラー値に対応する。
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Latin-1 の CSV を読み込み、行ごとに正規化する
///
/// # エラー
///
/// CSV として解析できない場合、または必須項目のカラムが存在しない場合は
/// `ImportError` を返す。行単位の不備は結果の `Err` として返す。
pub fn read_rows(bytes: &[u8], delimiter: u8) -> Result<Vec<RowResult>, ImportError> {
    let text = decode_latin1(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(text.as_bytes());

    let columns = ColumnMap::from_headers(reader.headers()?)?;

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let line = record.position().map_or(0, |p| p.line());
        rows.push((line, columns.normalize(line, &record)));
    }

    Ok(rows)
}

/// 項目ごとの候補カラム位置（優先順）
struct ColumnMap {
    full_name:  Vec<usize>,
    birth_date: Vec<usize>,
    email:      Vec<usize>,
    telephone:  Vec<usize>,
    cpf:        Vec<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &StringRecord) -> Result<Self, ImportError> {
        let normalized: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
        let positions = |candidates: &[&str]| -> Vec<usize> {
            candidates
                .iter()
                .filter_map(|c| normalized.iter().position(|h| h == c))
                .collect()
        };

        let columns = Self {
            full_name:  positions(NAME_COLUMNS),
            birth_date: positions(BIRTH_DATE_COLUMNS),
            email:      positions(EMAIL_COLUMNS),
            telephone:  positions(TELEPHONE_COLUMNS),
            cpf:        positions(CPF_COLUMNS),
        };

        let missing: Vec<&str> = [
            ("nome", &columns.full_name),
            ("datanascimento", &columns.birth_date),
            ("email", &columns.email),
            ("cpf", &columns.cpf),
        ]
        .into_iter()
        .filter(|(_, found)| found.is_empty())
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            return Err(ImportError::MissingColumns(missing.join(", ")));
        }

        Ok(columns)
    }

    fn normalize(&self, line: u64, record: &StringRecord) -> Result<CustomerRecord, RowRejection> {
        let full_name = first_value(record, &self.full_name)
            .ok_or(RowRejection::MissingField("氏名"))?;
        let raw_birth_date = first_value(record, &self.birth_date)
            .ok_or(RowRejection::MissingField("生年月日"))?;
        let email = first_value(record, &self.email)
            .ok_or(RowRejection::MissingField("メールアドレス"))?;
        let raw_cpf = first_value(record, &self.cpf).ok_or(RowRejection::MissingField("CPF"))?;

        let birth_date = parse_birth_date(raw_birth_date)
            .ok_or_else(|| RowRejection::InvalidBirthDate(raw_birth_date.to_string()))?;
        let cpf = normalize_cpf(raw_cpf).ok_or(RowRejection::InvalidCpf)?;
        let telephone = first_value(record, &self.telephone).and_then(normalize_telephone);

        Ok(CustomerRecord {
            line,
            full_name: full_name.to_string(),
            birth_date,
            email: email.to_string(),
            telephone,
            cpf,
        })
    }
}

/// 候補カラムのうち、最初に空でない値
fn first_value<'r>(record: &'r StringRecord, positions: &[usize]) -> Option<&'r str> {
    positions
        .iter()
        .filter_map(|&i| record.get(i))
        .map(str::trim)
        .find(|v| !v.is_empty())
}

/// `dd/mm/YYYY` または `YYYY-MM-DD` の日付
pub fn parse_birth_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let format = if raw.contains('/') {
        "%d/%m/%Y"
    } else if raw.contains('-') {
        "%Y-%m-%d"
    } else {
        return None;
    };

    NaiveDate::parse_from_str(raw, format).ok()
}

/// 数字だけを残した電話番号（先頭の `+` は保持）
pub fn normalize_telephone(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();

    if digits.is_empty() {
        return None;
    }

    Some(if raw.starts_with('+') {
        format!("+{digits}")
    } else {
        digits
    })
}

/// `.` と `-` を除去した 11 桁の CPF
pub fn normalize_cpf(raw: &str) -> Option<String> {
    let cpf: String = raw.trim().chars().filter(|c| !matches!(c, '.' | '-')).collect();

    (cpf.len() == 11 && cpf.chars().all(|c| c.is_ascii_digit())).then_some(cpf)
}

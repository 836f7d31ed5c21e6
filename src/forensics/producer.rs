//! Producer / software string classification
//!
//! Ordered rule classes, first match wins. ERP engines must stay ahead of the
//! generic scanner class because several vendors share names with printers.

use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Score for a missing or unrecognised producer.
pub const UNKNOWN_PRODUCER_SCORE: u8 = 50;

#[derive(Debug, Clone)]
pub struct ProducerRule {
    patterns: Vec<Regex>,
    pub score: u8,
    pub label: String,
}

impl ProducerRule {
    pub fn new(patterns: &[&str], score: u8, label: impl Into<String>) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                RegexBuilder::new(p)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| ConfigError::InvalidTunable {
                        name: "producer_rules".into(),
                        message: format!("'{}': {}", p, e),
                    })
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self {
            patterns,
            score,
            label: label.into(),
        })
    }

    fn matches(&self, producer: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(producer))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerVerdict {
    pub score: u8,
    pub description: String,
}

const CLASS_A: &[&str] = &[
    r"SAP.*(Adobe Document Services|ADS|SmartForms|NetWeaver)",
    r"Oracle.*(BI Publisher|E[- ]Business Suite|JDE|JD Edwards|PeopleSoft|NetSuite)",
    r"Microsoft Dynamics.*(365|AX|NAV|GP)",
    r"Intuit.*(QuickBooks)",
    r"Xero",
    r"Sage(?:\s|$|\d)|Sage Intacct",
    r"Zoho (Books|Invoice)",
    r"Odoo",
    r"Coupa|SAP Ariba",
    r"Workday",
    r"Stripe.*Invoice|Shopify.*Invoice|Square.*Invoice",
    r"Bill\.com",
    // IBM z/OS Infoprint AFP to PDF transforms
    r"IBM Print Transform from AFP to PDF.*Infoprint Server.*z/OS",
    r"IBM.*Infoprint Server.*z/OS",
    r"Infoprint Server.*AFP.*PDF",
    r"\bafpxpdf\b",
    r"(OpenText|HP)\s*Exstream",
    r"(GMC|Quadient)\s*Inspire",
    r"(Pitney\s*Bowes\s*)?EngageOne|\bDOC1\b",
    // national e-invoicing rails
    r"\bFatturaPA\b|\bSDI\b|\bSistema di Interscambio\b",
    r"\bFacturae\b",
    r"\bPeppol\b",
    r"\bKSeF\b",
    r"\bGSTN\b|\bIRP\b",
];

const CLASS_B: &[&str] = &[
    r"DocuSign",
    r"Adobe (Sign|Acrobat Sign)",
    r"(HelloSign|Dropbox Sign)",
    r"PandaDoc",
];

const CLASS_C: &[&str] = &[
    r"iText|iTextSharp|iText7",
    r"mPDF|TCPDF|FPDF|dompdf|pdfmake",
    r"ReportLab",
    r"Apache FOP|BIRT",
    r"wkhtmltopdf|Qt.*print.*engine",
    r"Prince",
    r"WeasyPrint",
    r"pdfTeX|LuaTeX|XeTeX|LaTeX",
    r"Microsoft (Word|Excel|PowerPoint)",
    r"Microsoft® (Word|Excel|PowerPoint)",
    r"LibreOffice|OpenOffice",
    r"Skia/PDF|Chrom(e|ium)",
    r"Quartz PDFContext|Mac OS X.*Quartz",
];

const CLASS_D: &[&str] = &[
    r"Microsoft Print to PDF",
    r"PDFCreator|Bullzip|PrimoPDF|CutePDF|doPDF|PDF24|PDFill",
    r"Nitro PDF (Creator|Pro)|Wondershare PDFelement",
    r"Foxit (Reader|Phantom) PDF (Printer|Editor)",
    r"Qoppa PDF.*",
    r"PDF-XChange (Editor|Printer)",
];

const CLASS_E: &[&str] = &[
    r"HP|Canon|Epson|Brother|Xerox|Ricoh|Kyocera|Konica Minolta|Sharp|Fuji Xerox|OKI",
    r"ABBYY FineReader|Kofax|Power PDF|OmniPage|Readiris|Nuance",
    r"CamScanner|Genius Scan|Scanbot|Adobe Scan|Office Lens|Scanner Pro|Tiny Scanner|Notebloc",
];

const CLASS_F: &[&str] = &[
    r"Adobe Photoshop|Adobe Illustrator|CorelDRAW",
    r"Affinity (Photo|Designer)",
    r"GIMP|Inkscape|Canva",
];

fn default_rules() -> Result<Vec<ProducerRule>> {
    Ok(vec![
        ProducerRule::new(CLASS_A, 5, "ERP or invoicing engine")?,
        ProducerRule::new(CLASS_B, 10, "E-signature or governed document system")?,
        ProducerRule::new(CLASS_C, 25, "Office or PDF software")?,
        ProducerRule::new(CLASS_D, 40, "Virtual printer or PDF editor")?,
        ProducerRule::new(CLASS_E, 55, "Scanner or mobile scan app")?,
        ProducerRule::new(CLASS_F, 65, "Graphics or design tool")?,
    ])
}

lazy_static! {
    static ref UNKNOWN_PRODUCER: Regex = RegexBuilder::new(r"^(|unknown|null|-|n/a)$")
        .case_insensitive(true)
        .build()
        .expect("static regex");
    static ref DEFAULT_RULES: Vec<ProducerRule> = default_rules().expect("static producer table");
}

/// Read-only producer lookup, built once and shared.
#[derive(Debug, Clone)]
pub struct ProducerClassifier {
    rules: Vec<ProducerRule>,
}

impl Default for ProducerClassifier {
    fn default() -> Self {
        Self {
            rules: DEFAULT_RULES.clone(),
        }
    }
}

impl ProducerClassifier {
    pub fn with_rules(rules: Vec<ProducerRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[ProducerRule] {
        &self.rules
    }

    pub fn classify(&self, producer: Option<&str>) -> ProducerVerdict {
        let trimmed = producer.map(str::trim).unwrap_or("");
        if UNKNOWN_PRODUCER.is_match(trimmed) {
            return ProducerVerdict {
                score: UNKNOWN_PRODUCER_SCORE,
                description: "Producer missing or unknown".into(),
            };
        }

        self.rules
            .iter()
            .find(|rule| rule.matches(trimmed))
            .map(|rule| ProducerVerdict {
                score: rule.score,
                description: rule.label.clone(),
            })
            .unwrap_or_else(|| ProducerVerdict {
                score: UNKNOWN_PRODUCER_SCORE,
                description: "Producer not recognized".into(),
            })
    }
}

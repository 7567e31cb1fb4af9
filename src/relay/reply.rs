//! User-facing reply texts.

use crate::relay::classify::{Classification, Command};
use crate::relay::forward::ForwardResult;

pub const SCAN_PROMPT: &str = "Сканируй QR-код чека";
pub const SCAN_BUTTON_TEXT: &str = "📷 Сканировать чек";

const STRUCTURED_PREFIX: &str = "Чек получен: ";
const PATTERN_PREFIX: &str = "Чек отправлен: ";

pub const PRIVACY_TEXT: &str = r#"Политика конфиденциальности проекта «PriceCrowd»

1) Общие положения
Сервис разработан в исследовательских и образовательных целях. Используя сервис, вы соглашаетесь с Политикой.

2) Цели обработки
- Расшифровка фискальных чеков (открытые данные ФНС)
- Статистический анализ цен
- Обезличенные отчёты

3) Обрабатываемые данные
- Данные из QR‑кода чека (дата, сумма, ФН/ФД/ФП и т.п.)
- Telegram‑ID отправителя
Сервис НЕ хранит: ФИО, телефон, адрес, ИНН, email, фото чеков/QR, данные карт.

4) Локальная обработка
Сканирование QR — на устройстве. На сервер отправляется только текст QR.

5) Права
Можно запросить удаление данных по Telegram‑ID. Пишите в боте."#;

/// Reply text for a classified message.
///
/// Forwarding classes need the upstream `result`; without one there is
/// nothing to acknowledge. Unmatched messages never get a reply.
pub fn reply(classification: &Classification, result: Option<&ForwardResult>) -> Option<String> {
    match classification {
        Classification::Command(Command::Scan) => Some(SCAN_PROMPT.to_string()),
        Classification::Command(Command::Privacy) => Some(PRIVACY_TEXT.to_string()),
        Classification::StructuredPayload(_) => {
            result.map(|r| format!("{STRUCTURED_PREFIX}{}", r.to_json_string()))
        }
        Classification::PatternMatch(_) => {
            result.map(|r| format!("{PATTERN_PREFIX}{}", r.to_json_string()))
        }
        Classification::Unmatched => None,
    }
}

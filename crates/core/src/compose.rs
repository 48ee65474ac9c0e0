//! Hindi reply text for each pipeline branch.

use crate::domain::knowledge::KnowledgeEntry;
use crate::domain::price::PriceQuote;
use crate::domain::query::Query;
use crate::domain::reply::{Reply, ReplyOrigin};
use crate::domain::weather::WeatherSnapshot;

pub const STATIC_FALLBACK_MESSAGE: &str = "क्षमा करें, अभी आपके प्रश्न का उत्तर उपलब्ध नहीं है। \
कृपया थोड़ी देर बाद फिर से पूछें या नज़दीकी कृषि विज्ञान केंद्र से संपर्क करें।";

pub const DEGRADED_PRICE_NOTE: &str =
    "(नोट: यह भाव वैकल्पिक स्रोत से लिया गया है, बेचने से पहले मंडी में पुष्टि करें।)";

const RAIN_LIKELY_HINT: &str = "बारिश की संभावना अधिक है, सिंचाई और दवा का छिड़काव अभी टालें।";
const DRY_SPELL_HINT: &str = "बारिश की संभावना कम है, फसल की अवस्था के अनुसार सिंचाई करें।";
const DRY_SPELL_THRESHOLD_PCT: u8 = 20;

pub fn knowledge_reply(query: &Query, entry: &KnowledgeEntry) -> Reply {
    let heading = match entry.growth_stage.as_deref() {
        Some(stage) => format!(
            "{} - {} सलाह ({}):",
            query.crop.hindi_name(),
            query.topic.hindi_label(),
            stage_hindi_label(stage)
        ),
        None => format!("{} - {} सलाह:", query.crop.hindi_name(), query.topic.hindi_label()),
    };
    Reply::new(format!("{heading} {}", entry.advice_text.trim()), ReplyOrigin::Knowledge)
}

fn stage_hindi_label(stage: &str) -> &str {
    match stage {
        "crown root initiation" => "शिखर जड़ अवस्था",
        "flowering" => "फूल आने की अवस्था",
        "pod formation" => "फली बनने की अवस्था",
        "tillering" => "कल्ले निकलने की अवस्था",
        other => other,
    }
}

pub fn weather_reply(snapshot: &WeatherSnapshot) -> Reply {
    let mut text = format!(
        "{} का मौसम: तापमान {:.1}°C, बारिश की संभावना {}%",
        snapshot.location, snapshot.temperature_c, snapshot.precipitation_probability
    );
    if let Some(humidity) = snapshot.relative_humidity {
        text.push_str(&format!(", नमी {humidity}%"));
    }
    if let Some(wind) = snapshot.wind_speed_kmh {
        text.push_str(&format!(", हवा {wind:.0} किमी/घंटा"));
    }
    text.push('।');

    if snapshot.rain_likely() {
        text.push(' ');
        text.push_str(RAIN_LIKELY_HINT);
    } else if snapshot.precipitation_probability <= DRY_SPELL_THRESHOLD_PCT {
        text.push(' ');
        text.push_str(DRY_SPELL_HINT);
    }

    Reply::new(text, ReplyOrigin::Weather)
}

pub fn price_reply(quote: &PriceQuote) -> Reply {
    let price = quote.price_per_unit.round_dp(2).normalize();
    let unit = if quote.unit == crate::domain::price::PRICE_UNIT_QUINTAL {
        "क्विंटल"
    } else {
        quote.unit.as_str()
    };
    let mut text =
        format!("{} मंडी में {} का भाव: ₹{price} प्रति {unit}।", quote.market, quote.crop.hindi_name());
    if quote.is_degraded() {
        text.push(' ');
        text.push_str(DEGRADED_PRICE_NOTE);
    }
    Reply::new(text, ReplyOrigin::Price)
}

pub fn generative_reply(text: &str) -> Reply {
    Reply::new(text.trim(), ReplyOrigin::Generative)
}

pub fn static_fallback_reply() -> Reply {
    Reply::new(STATIC_FALLBACK_MESSAGE, ReplyOrigin::StaticFallback)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::{
        knowledge_reply, price_reply, static_fallback_reply, weather_reply, DEGRADED_PRICE_NOTE,
        STATIC_FALLBACK_MESSAGE,
    };
    use crate::domain::knowledge::KnowledgeEntry;
    use crate::domain::price::{PriceQuote, PriceSourceTier};
    use crate::domain::query::{Crop, Query, Topic};
    use crate::domain::reply::ReplyOrigin;
    use crate::domain::weather::WeatherSnapshot;

    fn snapshot(precipitation_probability: u8) -> WeatherSnapshot {
        WeatherSnapshot {
            location: "Jaipur, Rajasthan".to_string(),
            temperature_c: 24.46,
            precipitation_probability,
            wind_speed_kmh: Some(11.2),
            relative_humidity: None,
            fetched_at: Utc::now(),
        }
    }

    fn quote(source: PriceSourceTier) -> PriceQuote {
        PriceQuote {
            crop: Crop::Mustard,
            price_per_unit: Decimal::new(540000, 2),
            unit: "quintal".to_string(),
            market: "Jaipur".to_string(),
            source,
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn knowledge_reply_carries_advice_and_crop_label() {
        let query = Query::new("सरसों के लिए सिंचाई?", Crop::Mustard, Topic::Irrigation, "Jaipur");
        let entry = KnowledgeEntry::new(
            Crop::Mustard,
            Topic::Irrigation,
            "First irrigation 25-30 days after sowing. ",
        );

        let reply = knowledge_reply(&query, &entry);

        assert_eq!(reply.origin, ReplyOrigin::Knowledge);
        assert_eq!(reply.text, "सरसों - सिंचाई सलाह: First irrigation 25-30 days after sowing.");
    }

    #[test]
    fn staged_advice_names_the_stage_in_hindi() {
        let query = Query::new("सरसों में फूल आने पर सिंचाई?", Crop::Mustard, Topic::Irrigation, "Jaipur")
            .with_stage("flowering");
        let entry = KnowledgeEntry::new(Crop::Mustard, Topic::Irrigation, "मिट्टी सूखी हो तो सिंचाई करें।")
            .with_stage("flowering");

        let reply = knowledge_reply(&query, &entry);

        assert_eq!(
            reply.text,
            "सरसों - सिंचाई सलाह (फूल आने की अवस्था): मिट्टी सूखी हो तो सिंचाई करें।"
        );
    }

    #[test]
    fn weather_reply_warns_when_rain_is_likely() {
        let reply = weather_reply(&snapshot(75));

        assert_eq!(reply.origin, ReplyOrigin::Weather);
        assert!(reply.text.starts_with("Jaipur, Rajasthan का मौसम: तापमान 24.5°C"));
        assert!(reply.text.contains("75%"));
        assert!(reply.text.contains("टालें"));
        assert!(reply.text.contains("हवा 11 किमी/घंटा"));
    }

    #[test]
    fn weather_reply_has_no_hint_in_uncertain_band() {
        let reply = weather_reply(&snapshot(40));
        assert!(reply.text.ends_with('।'));
        assert!(!reply.text.contains("टालें"));
    }

    #[test]
    fn fallback_price_is_annotated_as_degraded() {
        let primary = price_reply(&quote(PriceSourceTier::Primary));
        let fallback = price_reply(&quote(PriceSourceTier::Fallback));

        assert_eq!(primary.text, "Jaipur मंडी में सरसों का भाव: ₹5400 प्रति क्विंटल।");
        assert!(!primary.text.contains(DEGRADED_PRICE_NOTE));
        assert!(fallback.text.contains(DEGRADED_PRICE_NOTE));
        assert_eq!(fallback.origin, ReplyOrigin::Price);
    }

    #[test]
    fn static_fallback_is_fixed_text() {
        let reply = static_fallback_reply();
        assert_eq!(reply.text, STATIC_FALLBACK_MESSAGE);
        assert_eq!(reply.origin, ReplyOrigin::StaticFallback);
    }
}

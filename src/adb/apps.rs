/// Display name → Android package, as the model refers to apps.
pub const APP_PACKAGES: &[(&str, &str)] = &[
    // Social
    ("微信", "com.tencent.mm"),
    ("WeChat", "com.tencent.mm"),
    ("QQ", "com.tencent.mobileqq"),
    ("微博", "com.sina.weibo"),
    ("小红书", "com.xingin.xhs"),
    ("知乎", "com.zhihu.android"),
    ("豆瓣", "com.douban.frodo"),
    // Shopping
    ("淘宝", "com.taobao.taobao"),
    ("京东", "com.jingdong.app.mall"),
    ("拼多多", "com.xunmeng.pinduoduo"),
    ("闲鱼", "com.taobao.idlefish"),
    // Food & services
    ("美团", "com.sankuai.meituan"),
    ("饿了么", "me.ele"),
    ("大众点评", "com.dianping.v1"),
    ("支付宝", "com.eg.android.AlipayGphone"),
    // Travel
    ("高德地图", "com.autonavi.minimap"),
    ("百度地图", "com.baidu.BaiduMap"),
    ("滴滴出行", "com.sdu.didi.psnger"),
    ("携程", "ctrip.android.view"),
    ("12306", "com.MobileTicket"),
    // Media
    ("抖音", "com.ss.android.ugc.aweme"),
    ("快手", "com.smile.gifmaker"),
    ("哔哩哔哩", "tv.danmaku.bili"),
    ("bilibili", "tv.danmaku.bili"),
    ("网易云音乐", "com.netease.cloudmusic"),
    ("QQ音乐", "com.tencent.qqmusic"),
    ("今日头条", "com.ss.android.article.news"),
    // System and international
    ("Settings", "com.android.settings"),
    ("设置", "com.android.settings"),
    ("Chrome", "com.android.chrome"),
    ("Gmail", "com.google.android.gm"),
    ("Google Maps", "com.google.android.apps.maps"),
    ("YouTube", "com.google.android.youtube"),
    ("Telegram", "org.telegram.messenger"),
    ("WhatsApp", "com.whatsapp"),
    ("Contacts", "com.android.contacts"),
    ("Camera", "com.android.camera"),
    ("Clock", "com.android.deskclock"),
    ("Files", "com.android.documentsui"),
];

/// Package for a display name. Exact match first, then case-insensitive.
pub fn package_for(app_name: &str) -> Option<&'static str> {
    let name = app_name.trim();
    APP_PACKAGES
        .iter()
        .find(|(n, _)| *n == name)
        .or_else(|| APP_PACKAGES.iter().find(|(n, _)| n.eq_ignore_ascii_case(name)))
        .map(|(_, pkg)| *pkg)
}

/// First display name registered for a package.
pub fn app_for_package(package: &str) -> Option<&'static str> {
    APP_PACKAGES
        .iter()
        .find(|(_, pkg)| *pkg == package)
        .map(|(name, _)| *name)
}

/// Display names, in table order, for `--list-apps`.
pub fn supported_apps() -> Vec<&'static str> {
    APP_PACKAGES.iter().map(|(name, _)| *name).collect()
}
